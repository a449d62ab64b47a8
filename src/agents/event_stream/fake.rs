//! In-memory `CloudApi` that records every call, for tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use super::providers::{
    ApiFailure, CloudApi, CreateStackRequest, StackSummary, TrailInfo, UpdateStackRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    DescribeTrails,
    DescribeStacks,
    CreateStack,
    UpdateStack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    DescribeTrails(String),
    DescribeStacks(String, String),
    CreateStack(String, CreateStackRequest),
    UpdateStack(String, UpdateStackRequest),
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Call::CreateStack(..) | Call::UpdateStack(..))
    }

    pub fn region(&self) -> &str {
        match self {
            Call::DescribeTrails(r)
            | Call::DescribeStacks(r, _)
            | Call::CreateStack(r, _)
            | Call::UpdateStack(r, _) => r,
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeCloudApi {
    trails: HashMap<String, Vec<TrailInfo>>,
    stacks: Mutex<HashSet<(String, String)>>,
    failures: HashMap<(String, Op), ApiFailure>,
    delays: HashMap<String, Duration>,
    empty_describe: HashSet<String>,
    calls: Mutex<Vec<Call>>,
}

impl FakeCloudApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// A multi-region trail homed in `region`
    pub fn with_multi_region_trail(mut self, region: &str) -> Self {
        self.trails.entry(region.to_string()).or_default().push(TrailInfo {
            name: format!("org-trail-{}", region),
            is_multi_region: true,
            home_region: Some(region.to_string()),
        });
        self
    }

    /// A single-region trail homed in `region`
    pub fn with_home_trail(mut self, region: &str) -> Self {
        self.trails.entry(region.to_string()).or_default().push(TrailInfo {
            name: format!("trail-{}", region),
            is_multi_region: false,
            home_region: Some(region.to_string()),
        });
        self
    }

    /// Trails visible from `region` but homed elsewhere
    pub fn with_foreign_trail(mut self, region: &str, home: &str) -> Self {
        self.trails.entry(region.to_string()).or_default().push(TrailInfo {
            name: format!("trail-{}", home),
            is_multi_region: false,
            home_region: Some(home.to_string()),
        });
        self
    }

    pub fn with_stack(self, region: &str, stack_name: &str) -> Self {
        self.stacks
            .lock()
            .unwrap()
            .insert((region.to_string(), stack_name.to_string()));
        self
    }

    pub fn failing(mut self, region: &str, op: Op, failure: ApiFailure) -> Self {
        self.failures.insert((region.to_string(), op), failure);
        self
    }

    /// Report a missing stack in `region` as an empty list instead of an error
    pub fn with_empty_describe(mut self, region: &str) -> Self {
        self.empty_describe.insert(region.to_string());
        self
    }

    /// Delay every call made for `region`
    pub fn with_delay(mut self, region: &str, delay: Duration) -> Self {
        self.delays.insert(region.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    async fn record(&self, call: Call, op: Op) -> Result<(), ApiFailure> {
        let region = call.region().to_string();
        self.calls.lock().unwrap().push(call);

        if let Some(delay) = self.delays.get(&region) {
            tokio::time::sleep(*delay).await;
        }

        match self.failures.get(&(region, op)) {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CloudApi for FakeCloudApi {
    async fn describe_trails(&self, region: &str) -> Result<Vec<TrailInfo>, ApiFailure> {
        self.record(Call::DescribeTrails(region.to_string()), Op::DescribeTrails)
            .await?;

        // Multi-region trails show up everywhere as shadow trails
        let mut trails = self.trails.get(region).cloned().unwrap_or_default();
        trails.extend(
            self.trails
                .iter()
                .filter(|(home, _)| home.as_str() != region)
                .flat_map(|(_, list)| list.iter().filter(|t| t.is_multi_region).cloned()),
        );
        Ok(trails)
    }

    async fn describe_stacks(
        &self,
        region: &str,
        stack_name: &str,
    ) -> Result<Vec<StackSummary>, ApiFailure> {
        self.record(
            Call::DescribeStacks(region.to_string(), stack_name.to_string()),
            Op::DescribeStacks,
        )
        .await?;

        let key = (region.to_string(), stack_name.to_string());
        if self.stacks.lock().unwrap().contains(&key) {
            Ok(vec![StackSummary {
                stack_id: Some(format!("arn:aws:cloudformation:{}:1:stack/{}", region, stack_name)),
                stack_name: stack_name.to_string(),
            }])
        } else if self.empty_describe.contains(region) {
            Ok(Vec::new())
        } else {
            Err(ApiFailure::new(
                Some("ValidationError"),
                format!("Stack with id {} does not exist", stack_name),
            ))
        }
    }

    async fn create_stack(
        &self,
        region: &str,
        request: &CreateStackRequest,
    ) -> Result<Option<String>, ApiFailure> {
        self.record(
            Call::CreateStack(region.to_string(), request.clone()),
            Op::CreateStack,
        )
        .await?;

        self.stacks
            .lock()
            .unwrap()
            .insert((region.to_string(), request.stack_name.clone()));
        Ok(Some(format!(
            "arn:aws:cloudformation:{}:1:stack/{}",
            region, request.stack_name
        )))
    }

    async fn update_stack(
        &self,
        region: &str,
        request: &UpdateStackRequest,
    ) -> Result<Option<String>, ApiFailure> {
        self.record(
            Call::UpdateStack(region.to_string(), request.clone()),
            Op::UpdateStack,
        )
        .await?;
        Ok(None)
    }
}
