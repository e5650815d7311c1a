//! Request identity and per-request context.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4) for every inbound request
//! - Propagate it back to the client on the response
//! - Carry request ID and client address explicitly through the call chain
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - A generated ID stays inside the relay; only a client-supplied one is forwarded
//! - No ambient logging state: every log call receives a `RequestContext`

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderName, Request},
    middleware::Next,
    response::Response,
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Layer that assigns an `x-request-id` to requests that arrive without one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID), MakeRequestUuid)
}

/// Layer that copies the request's `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID))
}

/// Whether the client sent its own `x-request-id`.
///
/// Recorded before `SetRequestIdLayer` runs, since that layer writes the
/// generated ID into the request headers.
#[derive(Debug, Clone, Copy)]
pub struct InboundRequestId {
    pub client_supplied: bool,
}

/// Middleware that records `InboundRequestId`. Must wrap the set-ID layer.
pub async fn mark_inbound_request_id(mut request: Request<Body>, next: Next) -> Response {
    let client_supplied = request.headers().contains_key(X_REQUEST_ID);
    request
        .extensions_mut()
        .insert(InboundRequestId { client_supplied });
    next.run(request).await
}

/// Request-scoped diagnostic context, passed to every log call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub client_addr: String,
    /// The `x-request-id` header was generated by the relay, not sent by the client.
    pub relay_request_id: bool,
}

impl RequestContext {
    pub fn from_request(request: &Request<Body>) -> Self {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map(RequestId::header_value)
            .or_else(|| request.headers().get(X_REQUEST_ID))
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none")
            .to_string();
        let relay_request_id = matches!(
            request.extensions().get::<InboundRequestId>(),
            Some(InboundRequestId {
                client_supplied: false
            })
        );
        let client_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            request_id,
            client_addr,
            relay_request_id,
        }
    }
}
