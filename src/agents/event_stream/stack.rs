//! Stack Prober and Reconciler
//!
//! Decides between create and update for one region and issues the call.
//! Payloads are built by pure functions so they can be checked without a
//! provider.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info};

use super::providers::{
    ApiFailure, CloudApi, CreateStackRequest, StackParameter, StackTag, UpdateStackRequest,
};
use super::types::{EventStreamConfig, EventStreamError, StackStatus};

/// Template parameter receiving the devtime queue ARN
pub const PARAM_QUEUE_ARN: &str = "CloudCoreoDevTimeQueueArn";
/// Template parameter receiving the topic name
pub const PARAM_TOPIC_NAME: &str = "CloudCoreoDevTimeTopicName";
/// Template parameter receiving the monitor rule name
pub const PARAM_MONITOR_RULE: &str = "CloudCoreoDevTimeMonitorRule";

pub const TAG_VERSION: &str = "Version";
pub const TAG_LAST_UPDATED: &str = "LastUpdatedTime";

/// Template parameters for `config`
pub fn stack_parameters(config: &EventStreamConfig) -> Vec<StackParameter> {
    [
        (PARAM_QUEUE_ARN, &config.devtime_queue_arn),
        (PARAM_TOPIC_NAME, &config.topic_name),
        (PARAM_MONITOR_RULE, &config.monitor_rule),
    ]
    .into_iter()
    .map(|(key, value)| StackParameter {
        key: key.to_string(),
        value: value.clone(),
    })
    .collect()
}

/// Stack tags for `config`, stamped with `now`
pub fn stack_tags(config: &EventStreamConfig, now: DateTime<Utc>) -> Vec<StackTag> {
    vec![
        StackTag {
            key: TAG_VERSION.to_string(),
            value: config.version.clone(),
        },
        StackTag {
            key: TAG_LAST_UPDATED.to_string(),
            value: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        },
    ]
}

impl CreateStackRequest {
    pub fn from_config(config: &EventStreamConfig, now: DateTime<Utc>) -> Self {
        Self {
            stack_name: config.stack_name.clone(),
            template_url: config.template_url.clone(),
            parameters: stack_parameters(config),
            tags: stack_tags(config, now),
            keep_resources_on_failure: true,
        }
    }
}

impl UpdateStackRequest {
    pub fn from_config(config: &EventStreamConfig, now: DateTime<Utc>) -> Self {
        Self {
            stack_name: config.stack_name.clone(),
            template_url: config.template_url.clone(),
            parameters: stack_parameters(config),
            tags: stack_tags(config, now),
        }
    }
}

/// CloudFormation reports a missing stack as a `ValidationError` whose
/// message reads "Stack with id <name> does not exist" instead of an empty
/// result.
pub fn is_stack_not_found(failure: &ApiFailure) -> bool {
    failure.code.as_deref() == Some("ValidationError")
        && failure.message.contains("does not exist")
}

/// CloudFormation rejects an update that would change nothing with a
/// `ValidationError` reading "No updates are to be performed."
pub fn is_no_update(failure: &ApiFailure) -> bool {
    failure.code.as_deref() == Some("ValidationError")
        && failure.message.contains("No updates are to be performed")
}

/// Whether `stack_name` exists in `region`
pub async fn stack_exists(
    api: &dyn CloudApi,
    region: &str,
    stack_name: &str,
) -> Result<bool, EventStreamError> {
    match api.describe_stacks(region, stack_name).await {
        Ok(stacks) => {
            debug!(region = %region, stack_name = %stack_name, found = stacks.len(), "Described stacks");
            Ok(!stacks.is_empty())
        }
        Err(failure) if is_stack_not_found(&failure) => {
            debug!(region = %region, stack_name = %stack_name, "Stack does not exist");
            Ok(false)
        }
        Err(failure) => Err(EventStreamError::provider(region, failure)),
    }
}

/// Create or update the event stream stack in `region`
pub async fn reconcile(
    api: &dyn CloudApi,
    region: &str,
    config: &EventStreamConfig,
    exists: bool,
    now: DateTime<Utc>,
) -> Result<StackStatus, EventStreamError> {
    if exists {
        let request = UpdateStackRequest::from_config(config, now);
        match api.update_stack(region, &request).await {
            Ok(stack_id) => {
                info!(
                    region = %region,
                    stack_name = %config.stack_name,
                    stack_id = stack_id.as_deref().unwrap_or("-"),
                    "Successfully updated stack"
                );
                Ok(StackStatus::Updated)
            }
            Err(failure) if is_no_update(&failure) => {
                info!(region = %region, stack_name = %config.stack_name, "Stack already up to date");
                Ok(StackStatus::Unchanged)
            }
            Err(failure) => Err(EventStreamError::provider(region, failure)),
        }
    } else {
        let request = CreateStackRequest::from_config(config, now);
        let stack_id = api
            .create_stack(region, &request)
            .await
            .map_err(|e| EventStreamError::provider(region, e))?;

        info!(
            region = %region,
            stack_name = %config.stack_name,
            stack_id = stack_id.as_deref().unwrap_or("-"),
            "Successfully installed stack"
        );
        Ok(StackStatus::Created)
    }
}
