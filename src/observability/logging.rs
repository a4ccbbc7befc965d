//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Report gate decisions as structured events
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and environment (`RUST_LOG` wins)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::observability::metrics;
use crate::security::{AddressError, DecisionObserver};

/// Install the global tracing subscriber.
pub fn init_logging(config: &ObservabilityConfig) {
    let level = config.log_level.to_ascii_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("ip_deny_gate={level},tower_http={level}").into());

    let registry = tracing_subscriber::registry().with(filter);

    if config.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Observer that logs through `tracing` and counts in `metrics`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DecisionObserver for TracingObserver {
    fn invalid_candidate(&self, candidate: &str, error: &AddressError) {
        tracing::warn!(candidate = %candidate, error = %error, "Skipping unparseable client address");
        metrics::record_invalid_candidate(error);
    }

    fn denied(&self, address: &str) {
        tracing::warn!(client = %address, "Request denied");
    }
}
