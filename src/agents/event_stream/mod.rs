//! Event Stream Provisioning Agent
//!
//! Ensures the devtime event stream (a CloudFormation stack forwarding
//! account events to the devtime queue) exists and is current in every
//! requested region.
//!
//! ## Flow
//!
//! 1. Validate the config
//! 2. Open an AWS session (named profile or default chain)
//! 3. Gate: CloudTrail must be enabled in every region before anything is
//!    mutated anywhere
//! 4. Per region, independently: probe for the stack, then create or update it
//!
//! A failure in step 4 is recorded against its region and does not stop the
//! other regions.
//!
//! ## Example Usage
//!
//! ```ignore
//! use event_stream_agent::agents::event_stream::{setup_event_stream, SetupOptions};
//!
//! let outcome = setup_event_stream("devtime", None, &config, SetupOptions::default()).await;
//! if !outcome.is_success() {
//!     eprintln!("{}", outcome.display());
//! }
//! ```

pub mod aws;
pub mod providers;
pub mod session;
pub mod stack;
pub mod trail;
pub mod types;

#[cfg(test)]
mod fake;

#[allow(unused_imports)]
pub use aws::AwsCloudApi;
#[allow(unused_imports)]
pub use providers::{ApiFailure, CloudApi};
pub use session::Session;
#[allow(unused_imports)]
pub use types::{
    EventStreamConfig, EventStreamError, RegionFailure, RegionReport, RunState, SetupOptions,
    SetupOutcome, SetupSummary, StackAction, StackStatus,
};

use futures::stream::{self, StreamExt};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Event Stream Provisioning Agent
///
/// Runs the CloudTrail gate and the per-region create-or-update sequence
/// against any `CloudApi`.
pub struct EventStreamAgent<A: CloudApi> {
    api: A,
    options: SetupOptions,
}

impl EventStreamAgent<AwsCloudApi> {
    /// Open an AWS session and build an agent on top of it
    pub async fn connect(
        profile_name: &str,
        profile_path: Option<&Path>,
        options: SetupOptions,
    ) -> Result<Self, EventStreamError> {
        let session = Session::open(profile_name, profile_path).await?;
        Ok(Self::new(AwsCloudApi::new(session), options))
    }
}

impl<A: CloudApi> EventStreamAgent<A> {
    pub fn new(api: A, options: SetupOptions) -> Self {
        Self { api, options }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn options(&self) -> SetupOptions {
        self.options
    }

    /// Validate `config` and verify CloudTrail in every region, in order
    ///
    /// Stops at the first region that fails; no stack call is made.
    pub async fn check_preconditions(
        &self,
        config: &EventStreamConfig,
    ) -> Result<(), EventStreamError> {
        config.validate()?;

        for region in &config.regions {
            trail::check_trail(&self.api, region).await?;
        }

        info!(regions = config.regions.len(), "CloudTrail verified in every region");
        Ok(())
    }

    /// Provision the event stream in every region of `config`
    pub async fn setup(&self, config: &EventStreamConfig) -> SetupOutcome {
        info!(
            stack_name = %config.stack_name,
            regions = ?config.regions,
            dry_run = self.options.dry_run,
            "Starting event stream setup"
        );

        if let Err(e) = self.check_preconditions(config).await {
            error!(error = %e, "Precondition check failed, nothing was provisioned");
            return SetupOutcome::Aborted(e);
        }

        let results: Vec<_> = stream::iter(&config.regions)
            .map(|region| async move {
                let result = self.provision_region(config, region).await;
                if let Err(e) = &result {
                    warn!(region = %region, error = %e, "Region failed");
                }
                (region.clone(), result)
            })
            .buffered(self.options.parallelism.max(1))
            .collect()
            .await;

        let outcome = SetupOutcome::from_results(results);

        info!(
            succeeded = outcome.reports().len(),
            failed = outcome.failures().len(),
            "Event stream setup complete"
        );

        outcome
    }

    /// Probe then reconcile a single region
    async fn provision_region(
        &self,
        config: &EventStreamConfig,
        region: &str,
    ) -> Result<RegionReport, EventStreamError> {
        let exists = stack::stack_exists(&self.api, region, &config.stack_name).await?;
        let action = StackAction::for_existing(exists);

        debug!(region = %region, action = %action, "Stack probed");

        if self.options.dry_run {
            info!(region = %region, action = %action, "DRY RUN - stack call skipped");
            return Ok(RegionReport {
                region: region.to_string(),
                action,
                status: StackStatus::Planned,
            });
        }

        let status = stack::reconcile(&self.api, region, config, exists, chrono::Utc::now()).await?;

        Ok(RegionReport {
            region: region.to_string(),
            action,
            status,
        })
    }
}

/// Validate, open a session and run the whole setup
///
/// Config errors are reported before any credential lookup or AWS call.
pub async fn setup_event_stream(
    profile_name: &str,
    profile_path: Option<&Path>,
    config: &EventStreamConfig,
    options: SetupOptions,
) -> SetupOutcome {
    if let Err(e) = config.validate() {
        return SetupOutcome::Aborted(e);
    }

    match EventStreamAgent::connect(profile_name, profile_path, options).await {
        Ok(agent) => agent.setup(config).await,
        Err(e) => SetupOutcome::Aborted(e),
    }
}
