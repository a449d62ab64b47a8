//! Cloud API Adapter
//!
//! Trait-based seam over the four provider calls the engine makes, plus the
//! provider-neutral shapes that cross it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Normalized provider error: the service error code (when the provider sent
/// one) and a human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiFailure {
    pub code: Option<String>,
    pub message: String,
}

impl ApiFailure {
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_string),
            message: message.into(),
        }
    }
}

/// A CloudTrail trail as seen from one region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailInfo {
    pub name: String,
    pub is_multi_region: bool,
    pub home_region: Option<String>,
}

/// A CloudFormation stack returned by a describe call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSummary {
    pub stack_id: Option<String>,
    pub stack_name: String,
}

/// Template parameter key/value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackParameter {
    pub key: String,
    pub value: String,
}

/// Stack tag key/value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackTag {
    pub key: String,
    pub value: String,
}

/// Payload for a stack creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStackRequest {
    pub stack_name: String,
    pub template_url: String,
    pub parameters: Vec<StackParameter>,
    pub tags: Vec<StackTag>,
    /// Leave partially created resources in place when creation fails
    pub keep_resources_on_failure: bool,
}

/// Payload for an in-place stack update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStackRequest {
    pub stack_name: String,
    pub template_url: String,
    pub parameters: Vec<StackParameter>,
    pub tags: Vec<StackTag>,
}

/// Provider calls used by the event stream engine
///
/// Every call is scoped to a single region. Implementations must be safe to
/// share across concurrently running regional workers.
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// List every trail visible from `region`, shadow trails included
    async fn describe_trails(&self, region: &str) -> Result<Vec<TrailInfo>, ApiFailure>;

    /// Describe the stack called `stack_name` in `region`
    async fn describe_stacks(
        &self,
        region: &str,
        stack_name: &str,
    ) -> Result<Vec<StackSummary>, ApiFailure>;

    /// Start a stack creation, returning the new stack id when reported
    async fn create_stack(
        &self,
        region: &str,
        request: &CreateStackRequest,
    ) -> Result<Option<String>, ApiFailure>;

    /// Start an in-place stack update, returning the stack id when reported
    async fn update_stack(
        &self,
        region: &str,
        request: &UpdateStackRequest,
    ) -> Result<Option<String>, ApiFailure>;
}
