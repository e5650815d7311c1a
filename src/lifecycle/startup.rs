//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration (fail fast on a missing SOCKS5 endpoint)
//! - Build the shared tunnel transport
//! - Bind the listener last, once everything else is ready

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::validation::{describe, validate_config, ValidationError};
use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::tunnel::TransportError;

/// Fatal startup failures. The process must exit without serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", describe(.0))]
    Config(Vec<ValidationError>),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Prepare a ready-to-run server and its bound listener.
pub async fn prepare(config: ProxyConfig) -> Result<(HttpServer, TcpListener), StartupError> {
    validate_config(&config).map_err(StartupError::Config)?;

    let address = config.listener.bind_address();
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    Ok((server, listener))
}
