//! Agent modules for the event stream agent
//!
//! - `event_stream`: CloudTrail-gated provisioning of the devtime event
//!   stream stack across AWS regions

pub mod event_stream;

pub use event_stream::EventStreamAgent;
