//! Classification of client failures.

use std::error::Error as StdError;

use thiserror::Error;

use crate::proxy::error::ProxyError;

/// Fatal problems building the tunnel at startup.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("SOCKS5 host and port must be configured")]
    MissingEndpoint,

    #[error("Invalid SOCKS5 proxy: {0}")]
    Proxy(#[source] reqwest::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

const TLS_MARKERS: &[&str] = &["tls", "ssl", "certificate", "handshake"];

/// Map a reqwest failure onto the relay's error taxonomy.
///
/// Order matters: timeouts first, then TLS (which reqwest also reports as a
/// connect error), then generic connect failures.
pub fn classify(err: reqwest::Error) -> ProxyError {
    // The URL is the caller's; it must not influence classification.
    let err = err.without_url();
    let message = error_chain(&err);

    if err.is_timeout() || chain_has_timeout(&err) {
        return ProxyError::Timeout;
    }
    if is_tls_failure(&message) {
        return ProxyError::Tls(message);
    }
    if err.is_connect() {
        return ProxyError::TunnelConnect(message);
    }
    ProxyError::Unclassified(message)
}

/// Render an error and all of its sources as one line.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
        source = inner.source();
    }
    parts.join(": ")
}

fn chain_has_timeout(err: &(dyn StdError + 'static)) -> bool {
    let mut source = err.source();
    while let Some(inner) = source {
        if let Some(io) = inner.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        source = inner.source();
    }
    false
}

fn is_tls_failure(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    TLS_MARKERS.iter().any(|m| lower.contains(m))
}
