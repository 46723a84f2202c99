//! opsroute - provider health tracking and orchestration router
//!
//! Tracks the live health of local and cloud language-model providers,
//! routes ITSM agent decision requests to the best available provider with a
//! single fallback attempt, and keeps a bounded audit log of decisions.

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod orchestration;
pub mod providers;
pub mod router;
pub mod telemetry;
