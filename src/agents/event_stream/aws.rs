//! AWS Adapter
//!
//! `CloudApi` backed by the CloudTrail and CloudFormation SDK clients. Raw
//! SDK errors are flattened into `ApiFailure` here and go no further.

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_cloudformation::types::{OnFailure, Parameter, Stack, Tag};
use tracing::debug;

use super::providers::{
    ApiFailure, CloudApi, CreateStackRequest, StackParameter, StackSummary, StackTag,
    TrailInfo, UpdateStackRequest,
};
use super::session::Session;

/// CloudTrail + CloudFormation client factory bound to one session
#[derive(Debug, Clone)]
pub struct AwsCloudApi {
    session: Session,
}

impl AwsCloudApi {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    fn cloudtrail(&self, region: &str) -> aws_sdk_cloudtrail::Client {
        let config = aws_sdk_cloudtrail::config::Builder::from(self.session.sdk_config())
            .region(Region::new(region.to_string()))
            .build();
        aws_sdk_cloudtrail::Client::from_conf(config)
    }

    fn cloudformation(&self, region: &str) -> aws_sdk_cloudformation::Client {
        let config = aws_sdk_cloudformation::config::Builder::from(self.session.sdk_config())
            .region(Region::new(region.to_string()))
            .build();
        aws_sdk_cloudformation::Client::from_conf(config)
    }
}

fn api_failure<E>(err: E) -> ApiFailure
where
    E: ProvideErrorMetadata + std::error::Error,
{
    let message = match err.message() {
        Some(message) => message.to_string(),
        None => DisplayErrorContext(&err).to_string(),
    };
    ApiFailure::new(err.code(), message)
}

fn sdk_parameters(parameters: &[StackParameter]) -> Vec<Parameter> {
    parameters
        .iter()
        .map(|p| {
            Parameter::builder()
                .parameter_key(&p.key)
                .parameter_value(&p.value)
                .build()
        })
        .collect()
}

fn sdk_tags(tags: &[StackTag]) -> Vec<Tag> {
    tags.iter()
        .map(|t| Tag::builder().key(&t.key).value(&t.value).build())
        .collect()
}

fn stack_summary(stack: &Stack, requested_name: &str) -> StackSummary {
    StackSummary {
        stack_id: stack.stack_id().map(str::to_string),
        stack_name: stack
            .stack_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(requested_name)
            .to_string(),
    }
}

#[async_trait]
impl CloudApi for AwsCloudApi {
    async fn describe_trails(&self, region: &str) -> Result<Vec<TrailInfo>, ApiFailure> {
        let output = self
            .cloudtrail(region)
            .describe_trails()
            .include_shadow_trails(true)
            .send()
            .await
            .map_err(api_failure)?;

        Ok(output
            .trail_list()
            .iter()
            .map(|t| TrailInfo {
                name: t.name().unwrap_or_default().to_string(),
                is_multi_region: t.is_multi_region_trail().unwrap_or(false),
                home_region: t.home_region().map(str::to_string),
            })
            .collect())
    }

    async fn describe_stacks(
        &self,
        region: &str,
        stack_name: &str,
    ) -> Result<Vec<StackSummary>, ApiFailure> {
        let output = self
            .cloudformation(region)
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(api_failure)?;

        Ok(output
            .stacks()
            .iter()
            .map(|s| stack_summary(s, stack_name))
            .collect())
    }

    async fn create_stack(
        &self,
        region: &str,
        request: &CreateStackRequest,
    ) -> Result<Option<String>, ApiFailure> {
        let on_failure = if request.keep_resources_on_failure {
            OnFailure::DoNothing
        } else {
            OnFailure::Rollback
        };

        debug!(region = %region, stack_name = %request.stack_name, "CreateStack");

        let output = self
            .cloudformation(region)
            .create_stack()
            .stack_name(&request.stack_name)
            .template_url(&request.template_url)
            .set_parameters(Some(sdk_parameters(&request.parameters)))
            .set_tags(Some(sdk_tags(&request.tags)))
            .on_failure(on_failure)
            .send()
            .await
            .map_err(api_failure)?;

        Ok(output.stack_id().map(str::to_string))
    }

    async fn update_stack(
        &self,
        region: &str,
        request: &UpdateStackRequest,
    ) -> Result<Option<String>, ApiFailure> {
        debug!(region = %region, stack_name = %request.stack_name, "UpdateStack");

        let output = self
            .cloudformation(region)
            .update_stack()
            .stack_name(&request.stack_name)
            .template_url(&request.template_url)
            .set_parameters(Some(sdk_parameters(&request.parameters)))
            .set_tags(Some(sdk_tags(&request.tags)))
            .send()
            .await
            .map_err(api_failure)?;

        Ok(output.stack_id().map(str::to_string))
    }
}
