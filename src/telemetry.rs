//! Telemetry and observability setup
//!
//! Configures structured logging with tracing and tracing-subscriber.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(level: &str) -> String {
    format!("opsroute={},tower_http=debug", level)
}

/// Initialize tracing subscriber for structured logging
///
/// Only the first call per process installs a subscriber; later calls are
/// ignored, as is a subscriber already installed by someone else.
///
/// `RUST_LOG` overrides `default_level` (from `observability.log_level`).
///
/// # Examples
///
/// ```no_run
/// opsroute::telemetry::init("info");
/// tracing::info!("Application started");
/// ```
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(default_level)));

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init();

        if let Err(e) = installed {
            eprintln!("opsroute: tracing subscriber not installed: {}", e);
        }
    });
}
