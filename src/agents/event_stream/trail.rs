//! CloudTrail precondition gate

use tracing::{debug, info};

use super::providers::{CloudApi, TrailInfo};
use super::types::EventStreamError;

/// Whether `trails` cover `region`: any multi-region trail, or a trail whose
/// home region is `region`
pub fn trail_covers_region(trails: &[TrailInfo], region: &str) -> bool {
    trails.iter().any(|t| t.is_multi_region)
        || trails
            .iter()
            .any(|t| t.home_region.as_deref() == Some(region))
}

/// Verify CloudTrail is enabled for `region`
pub async fn check_trail(api: &dyn CloudApi, region: &str) -> Result<(), EventStreamError> {
    info!(region = %region, "Verifying that CloudTrail is enabled");

    let trails = api
        .describe_trails(region)
        .await
        .map_err(|e| EventStreamError::provider(region, e))?;

    debug!(region = %region, trails = trails.len(), "Trails visible from region");

    if trail_covers_region(&trails, region) {
        Ok(())
    } else {
        Err(EventStreamError::Precondition {
            region: region.to_string(),
        })
    }
}
