//! Provider health tracking
//!
//! Each provider gets a dedicated worker task that probes it on a schedule
//! and on demand, classifies the result and publishes a [`HealthRecord`].

pub mod monitor;
pub mod record;

pub use monitor::HealthMonitor;
pub use record::{HealthPolicy, HealthRecord, HealthSnapshot, HealthStatus};
