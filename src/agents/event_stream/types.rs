//! Event Stream Types
//!
//! Desired-state descriptor, run options, per-region reports and the error
//! taxonomy shared by every stage of a provisioning run.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Desired state for one event stream deployment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventStreamConfig {
    /// Target regions, processed in this order
    pub regions: Vec<String>,
    /// Stack name, identical in every region
    pub stack_name: String,
    /// Location of the CloudFormation template
    #[serde(alias = "templateURL")]
    pub template_url: String,
    /// ARN of the devtime queue the stack forwards events to
    pub devtime_queue_arn: String,
    /// SNS topic name created by the stack
    pub topic_name: String,
    /// EventBridge rule name created by the stack
    pub monitor_rule: String,
    /// Caller-supplied version, recorded as a stack tag
    pub version: String,
}

impl EventStreamConfig {
    /// Check the config before any provider call is made
    pub fn validate(&self) -> Result<(), EventStreamError> {
        if self.regions.is_empty() {
            return Err(EventStreamError::Config(
                "at least one region is required".to_string(),
            ));
        }
        if self.stack_name.trim().is_empty() {
            return Err(EventStreamError::Config("stack name is empty".to_string()));
        }
        if self.template_url.trim().is_empty() {
            return Err(EventStreamError::Config(
                "template URL is empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for region in &self.regions {
            if region.trim().is_empty() {
                return Err(EventStreamError::Config(
                    "region identifiers must not be empty".to_string(),
                ));
            }
            if !seen.insert(region.as_str()) {
                return Err(EventStreamError::Config(format!(
                    "region {} is listed more than once",
                    region
                )));
            }
        }

        Ok(())
    }
}

/// Run-time knobs, passed in explicitly rather than read from globals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupOptions {
    /// Maximum number of regions provisioned at the same time
    pub parallelism: usize,
    /// Probe only; never create or update a stack
    pub dry_run: bool,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            parallelism: 1,
            dry_run: false,
        }
    }
}

impl SetupOptions {
    /// Set the regional worker bound (zero is treated as one)
    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Enable or disable dry-run mode
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// What the reconciler decided to do with a region's stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackAction {
    Create,
    Update,
}

impl StackAction {
    /// Pick the action from the prober's answer
    pub fn for_existing(exists: bool) -> Self {
        if exists {
            StackAction::Update
        } else {
            StackAction::Create
        }
    }
}

impl std::fmt::Display for StackAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackAction::Create => write!(f, "create"),
            StackAction::Update => write!(f, "update"),
        }
    }
}

/// Result of reconciling one region's stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackStatus {
    Created,
    Updated,
    /// The provider accepted the update but had nothing to change
    Unchanged,
    /// Dry run: the action was decided but not sent
    Planned,
}

impl std::fmt::Display for StackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackStatus::Created => write!(f, "created"),
            StackStatus::Updated => write!(f, "updated"),
            StackStatus::Unchanged => write!(f, "unchanged"),
            StackStatus::Planned => write!(f, "planned"),
        }
    }
}

/// Successful outcome for a single region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionReport {
    pub region: String,
    pub action: StackAction,
    pub status: StackStatus,
}

/// Failed outcome for a single region
#[derive(Debug)]
pub struct RegionFailure {
    pub region: String,
    pub error: EventStreamError,
}

/// Overall outcome of a provisioning run
#[derive(Debug)]
pub enum SetupOutcome {
    /// Every region was reconciled
    Completed(Vec<RegionReport>),
    /// The gate passed but at least one region failed to reconcile
    PartiallyFailed {
        reports: Vec<RegionReport>,
        failures: Vec<RegionFailure>,
    },
    /// Nothing was mutated
    Aborted(EventStreamError),
}

impl SetupOutcome {
    /// Build the outcome from per-region results, keeping their order
    pub fn from_results(results: Vec<(String, Result<RegionReport, EventStreamError>)>) -> Self {
        let mut reports = Vec::new();
        let mut failures = Vec::new();

        for (region, result) in results {
            match result {
                Ok(report) => reports.push(report),
                Err(error) => failures.push(RegionFailure { region, error }),
            }
        }

        if failures.is_empty() {
            SetupOutcome::Completed(reports)
        } else {
            SetupOutcome::PartiallyFailed { reports, failures }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SetupOutcome::Completed(_))
    }

    /// Regions that reconciled successfully
    pub fn reports(&self) -> &[RegionReport] {
        match self {
            SetupOutcome::Completed(reports) => reports.as_slice(),
            SetupOutcome::PartiallyFailed { reports, .. } => reports.as_slice(),
            SetupOutcome::Aborted(_) => &[],
        }
    }

    /// Regions that failed during provisioning
    pub fn failures(&self) -> &[RegionFailure] {
        match self {
            SetupOutcome::PartiallyFailed { failures, .. } => failures.as_slice(),
            _ => &[],
        }
    }

    /// Serializable view for JSON output
    pub fn summary(&self) -> SetupSummary {
        let state = match self {
            SetupOutcome::Completed(_) => RunState::Completed,
            SetupOutcome::PartiallyFailed { .. } => RunState::PartiallyFailed,
            SetupOutcome::Aborted(_) => RunState::Aborted,
        };

        let mut errors: Vec<RegionError> = self
            .failures()
            .iter()
            .map(|f| RegionError {
                region: Some(f.region.clone()),
                message: f.error.to_string(),
            })
            .collect();

        if let SetupOutcome::Aborted(error) = self {
            errors.push(RegionError {
                region: error.region().map(str::to_string),
                message: error.to_string(),
            });
        }

        SetupSummary {
            state,
            regions: self.reports().to_vec(),
            errors,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Format the outcome for display
    pub fn display(&self) -> String {
        let mut lines = Vec::new();

        for report in self.reports() {
            let line = match report.status {
                StackStatus::Planned => format!(
                    "Would {} stack in region {}",
                    report.action, report.region
                ),
                status => format!("Stack {} in region {}", status, report.region),
            };
            lines.push(line);
        }

        for failure in self.failures() {
            lines.push(format!("Failed in region {}: {}", failure.region, failure.error));
        }

        if let SetupOutcome::Aborted(error) = self {
            lines.push(format!("Aborted: {}", error));
        }

        lines.join("\n")
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Completed,
    PartiallyFailed,
    Aborted,
}

/// Error entry in a serialized summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub message: String,
}

/// JSON-friendly summary of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupSummary {
    pub state: RunState,
    pub regions: Vec<RegionReport>,
    pub errors: Vec<RegionError>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Errors that can occur while provisioning an event stream
#[derive(Debug, Error)]
pub enum EventStreamError {
    /// Malformed or incomplete config
    #[error("Invalid event stream config: {0}")]
    Config(String),

    /// No usable AWS credentials
    #[error("No usable AWS credentials: {0}")]
    Credential(String),

    /// Trail requirement unmet
    #[error("CloudTrail is not enabled in region {region}")]
    Precondition { region: String },

    /// AWS call failed
    #[error("{cause} in region {region}")]
    Provider { region: String, cause: String },
}

impl EventStreamError {
    /// Region the error is attributed to, if any
    pub fn region(&self) -> Option<&str> {
        match self {
            EventStreamError::Precondition { region } => Some(region),
            EventStreamError::Provider { region, .. } => Some(region),
            _ => None,
        }
    }

    pub(crate) fn provider(region: &str, cause: impl std::fmt::Display) -> Self {
        EventStreamError::Provider {
            region: region.to_string(),
            cause: cause.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EventStreamConfig {
        EventStreamConfig {
            regions: vec!["us-east-1".to_string(), "us-west-2".to_string()],
            stack_name: "cc-events".to_string(),
            template_url: "https://example.s3.amazonaws.com/events.json".to_string(),
            devtime_queue_arn: "arn:aws:sqs:us-east-1:123456789012:devtime".to_string(),
            topic_name: "devtime-topic".to_string(),
            monitor_rule: "devtime-rule".to_string(),
            version: "1.2.0".to_string(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_empty_regions_rejected() {
        let mut cfg = config();
        cfg.regions.clear();
        assert!(matches!(cfg.validate(), Err(EventStreamError::Config(_))));
    }

    #[test]
    fn test_blank_stack_name_and_template_rejected() {
        let mut cfg = config();
        cfg.stack_name = "  ".to_string();
        assert!(matches!(cfg.validate(), Err(EventStreamError::Config(_))));

        let mut cfg = config();
        cfg.template_url = String::new();
        assert!(matches!(cfg.validate(), Err(EventStreamError::Config(_))));
    }

    #[test]
    fn test_duplicate_region_rejected() {
        let mut cfg = config();
        cfg.regions.push("us-east-1".to_string());
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("us-east-1"));
    }

    #[test]
    fn test_config_from_control_plane_json() {
        let json = r#"{
            "regions": ["us-east-1"],
            "stackName": "cc-events",
            "templateURL": "https://example.com/t.json",
            "devtimeQueueArn": "arn:aws:sqs:us-east-1:1:q",
            "topicName": "t",
            "monitorRule": "r",
            "version": "2"
        }"#;
        let cfg: EventStreamConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.template_url, "https://example.com/t.json");
        assert_eq!(cfg.stack_name, "cc-events");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_setup_options_builder() {
        let opts = SetupOptions::default().parallelism(0).dry_run(true);
        assert_eq!(opts.parallelism, 1);
        assert!(opts.dry_run);
    }

    #[test]
    fn test_outcome_from_results() {
        let results = vec![
            (
                "us-east-1".to_string(),
                Ok(RegionReport {
                    region: "us-east-1".to_string(),
                    action: StackAction::Create,
                    status: StackStatus::Created,
                }),
            ),
            (
                "eu-west-1".to_string(),
                Err(EventStreamError::provider("eu-west-1", "Throttling")),
            ),
        ];

        let outcome = SetupOutcome::from_results(results);
        assert!(!outcome.is_success());
        assert_eq!(outcome.reports().len(), 1);
        assert_eq!(outcome.failures()[0].region, "eu-west-1");

        let summary = outcome.summary();
        assert_eq!(summary.state, RunState::PartiallyFailed);
        assert_eq!(summary.errors[0].message, "Throttling in region eu-west-1");
    }

    #[test]
    fn test_aborted_summary_names_region() {
        let outcome = SetupOutcome::Aborted(EventStreamError::Precondition {
            region: "eu-west-1".to_string(),
        });
        let summary = outcome.summary();
        assert_eq!(summary.state, RunState::Aborted);
        assert_eq!(summary.errors[0].region.as_deref(), Some("eu-west-1"));
        assert!(outcome.display().contains("eu-west-1"));
    }
}
