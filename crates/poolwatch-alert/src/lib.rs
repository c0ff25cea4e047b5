//! Online analytics and alert deduplication for access-log streams.
//!
//! The [`engine::AlertEngine`] owns a bounded [`window::RollingWindow`] of
//! upstream statuses, a [`completeness::FieldCompletenessTracker`], and the
//! [`state::AlertState`] that remembers the last pool, the error-rate latch
//! and the cooldown clock. Each parsed record goes through
//! [`engine::AlertEngine::process_record`], which returns the alerts to
//! deliver for that record.

pub mod completeness;
pub mod cooldown;
pub mod engine;
pub mod state;
pub mod window;


pub use cooldown::CooldownScope;
pub use engine::{AlertEngine, EngineConfig};
pub use state::ErrorState;
