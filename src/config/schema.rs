//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Upstream REST API settings.
    pub upstream: UpstreamConfig,

    /// SOCKS5 tunnel every upstream call is routed through.
    pub socks5: Socks5Config,

    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// Debug mode (verbose logging).
    pub debug: bool,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Upstream API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL requests are forwarded to (path suffix is appended).
    pub base_url: String,

    /// Deadline in seconds for connect + first byte of every upstream call.
    pub timeout_secs: u64,

    /// TCP connect timeout to the SOCKS5 endpoint.
    pub connect_timeout_secs: u64,

    /// Maximum accepted inbound request body, in bytes.
    pub max_body_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// SOCKS5 tunnel configuration.
///
/// Host and port are optional in the schema so that a missing value can be
/// reported by validation instead of a parse error.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Socks5Config {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Socks5Config {
    /// Build the proxy URL for the tunnel.
    ///
    /// Always `socks5h` so hostnames are resolved on the far side of the tunnel.
    /// Returns `None` when host or port is missing.
    pub fn proxy_url(&self) -> Option<String> {
        let host = self.host.as_deref().filter(|h| !h.is_empty())?;
        let port = self.port.filter(|p| *p != 0)?;
        let auth = match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                format!("{}:{}@", user, pass)
            }
            _ => String::new(),
        };
        Some(format!("socks5h://{}{}:{}", auth, host, port))
    }

    /// Same as `proxy_url` with the password masked, for logging.
    pub fn redacted_url(&self) -> Option<String> {
        let mut masked = self.clone();
        if masked.password.is_some() {
            masked.password = Some("****".to_string());
        }
        masked.proxy_url()
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Port to bind.
    pub port: u16,
}

impl ListenerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8868,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
