//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Require a complete SOCKS5 endpoint before anything is served
//! - Validate value ranges (timeouts > 0, ports valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("socks5.host must be set")]
    MissingSocksHost,

    #[error("socks5.port must be set to a non-zero port")]
    MissingSocksPort,

    #[error("socks5.username and socks5.password must be set together")]
    PartialSocksCredentials,

    #[error("upstream.base_url is invalid: {0}")]
    InvalidBaseUrl(String),

    #[error("upstream.timeout_secs must be greater than zero")]
    ZeroTimeout,
}

/// Render a list of validation errors as one line.
pub fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let socks = &config.socks5;
    if socks.host.as_deref().map_or(true, |h| h.trim().is_empty()) {
        errors.push(ValidationError::MissingSocksHost);
    }
    if socks.port.map_or(true, |p| p == 0) {
        errors.push(ValidationError::MissingSocksPort);
    }
    if socks.username.is_some() != socks.password.is_some() {
        errors.push(ValidationError::PartialSocksCredentials);
    }

    match Url::parse(&config.upstream.base_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::InvalidBaseUrl(format!(
            "unsupported scheme '{}'",
            url.scheme()
        ))),
        Err(e) => errors.push(ValidationError::InvalidBaseUrl(e.to_string())),
    }

    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
