//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{describe, validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {name}: '{value}'")]
    Env { name: &'static str, value: String },

    #[error("Validation failed: {}", describe(.0))]
    Validation(Vec<ValidationError>),
}

/// Load configuration from an optional TOML file plus process environment,
/// then validate it.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// `lookup` returns the value of a variable if set. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = get("OPENAI_BASE_URL") {
        config.upstream.base_url = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = get("SOCKS5_PROXY_HOST") {
        config.socks5.host = Some(v);
    }
    if let Some(v) = get("SOCKS5_PROXY_PORT") {
        config.socks5.port = Some(parse_env("SOCKS5_PROXY_PORT", v)?);
    }
    if let Some(v) = get("SOCKS5_PROXY_USERNAME") {
        config.socks5.username = Some(v);
    }
    if let Some(v) = get("SOCKS5_PROXY_PASSWORD") {
        config.socks5.password = Some(v);
    }
    if let Some(v) = get("FLASK_HOST") {
        config.listener.host = v;
    }
    if let Some(v) = get("FLASK_PORT") {
        config.listener.port = parse_env("FLASK_PORT", v)?;
    }
    if let Some(v) = get("FLASK_DEBUG") {
        config.debug = v.eq_ignore_ascii_case("true");
    }
    if let Some(v) = get("UPSTREAM_TIMEOUT_SECS") {
        config.upstream.timeout_secs = parse_env("UPSTREAM_TIMEOUT_SECS", v)?;
    }

    Ok(())
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { name, value })
}
