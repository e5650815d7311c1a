//! Relay error taxonomy.
//!
//! Every failure on the request path ends up as exactly one `ProxyError`
//! variant, and every variant has exactly one outward status code.
//!
//! | Variant                      | Status            |
//! |------------------------------|-------------------|
//! | `MissingCredential`          | 401               |
//! | `MalformedRequestBody`       | 400               |
//! | `Tls`                        | 502               |
//! | `TunnelConnect`              | 503               |
//! | `Timeout`                    | 504               |
//! | `UpstreamHttp`               | upstream's status |
//! | `Unclassified`               | 500               |
//! | `MalformedUpstreamResponse`  | 500               |

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde_json::json;
use thiserror::Error;

/// Maximum number of characters of a non-JSON upstream body echoed back.
pub const RAW_CONTENT_LIMIT: usize = 400;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// No `Authorization` header on the inbound request.
    #[error("Authorization header is required")]
    MissingCredential,

    /// POST body absent, unreadable or not JSON.
    #[error("Request body must be JSON: {0}")]
    MalformedRequestBody(String),

    /// Could not reach the upstream through the tunnel.
    #[error("Connection failed: {0}")]
    TunnelConnect(String),

    /// TLS negotiation with the upstream failed.
    #[error("SSL error: {0}")]
    Tls(String),

    /// The upstream did not answer within the configured deadline.
    #[error("Request timed out")]
    Timeout,

    /// The upstream answered with a non-2xx status.
    #[error("Upstream returned {status}")]
    UpstreamHttp {
        status: StatusCode,
        body: Bytes,
        content_type: Option<HeaderValue>,
    },

    /// Any other client failure.
    #[error("{0}")]
    Unclassified(String),

    /// 2xx response whose body was not valid JSON.
    #[error("Invalid JSON response from upstream")]
    MalformedUpstreamResponse { raw_content: String },
}

impl ProxyError {
    /// Build the malformed-upstream error from a raw body, keeping at most
    /// `RAW_CONTENT_LIMIT` characters.
    pub fn malformed_upstream(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let raw_content = text.chars().take(RAW_CONTENT_LIMIT).collect();
        ProxyError::MalformedUpstreamResponse { raw_content }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingCredential => StatusCode::UNAUTHORIZED,
            ProxyError::MalformedRequestBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::Tls(_) => StatusCode::BAD_GATEWAY,
            ProxyError::TunnelConnect(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::UpstreamHttp { status, .. } => *status,
            ProxyError::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::MalformedUpstreamResponse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for log fields and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MissingCredential => "missing_credential",
            ProxyError::MalformedRequestBody(_) => "malformed_request_body",
            ProxyError::Tls(_) => "tls_failed",
            ProxyError::TunnelConnect(_) => "tunnel_connect_failed",
            ProxyError::Timeout => "timeout",
            ProxyError::UpstreamHttp { .. } => "upstream_http",
            ProxyError::Unclassified(_) => "unclassified",
            ProxyError::MalformedUpstreamResponse { .. } => "malformed_upstream_response",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        match self {
            ProxyError::UpstreamHttp {
                body, content_type, ..
            } => {
                let content_type = content_type
                    .unwrap_or_else(|| HeaderValue::from_static("application/json"));
                let mut response = Response::new(Body::from(body));
                *response.status_mut() = status;
                response
                    .headers_mut()
                    .insert(header::CONTENT_TYPE, content_type);
                response
            }
            ProxyError::MalformedUpstreamResponse { raw_content } => {
                let payload = json!({ "error": message, "raw_content": raw_content });
                (status, Json(payload)).into_response()
            }
            _ => (status, Json(json!({ "error": message }))).into_response(),
        }
    }
}
