//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Choose the filter from `RUST_LOG`, else from config
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Request ID and client address are explicit fields on each event, not ambient state

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ProxyConfig;

/// Default filter directive when `RUST_LOG` is not set.
pub fn default_directive(config: &ProxyConfig) -> String {
    let level = if config.debug {
        "debug"
    } else {
        config.observability.log_level.as_str()
    };
    format!("socks_relay={level},tower_http={level}")
}

/// Install the global tracing subscriber.
pub fn init_logging(config: &ProxyConfig) {
    let directive = default_directive(config);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| directive.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
