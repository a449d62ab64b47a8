//! Event Stream Agent Library
//!
//! Provisions the devtime event stream in AWS accounts: verifies CloudTrail
//! in every target region, then creates or updates the event stream stack
//! region by region.

pub mod agents;

pub use agents::event_stream;
pub use agents::EventStreamAgent;
