//! Outbound header derivation.
//!
//! Every inbound header is forwarded verbatim except `Host`, which belongs to
//! the relay's own listener. Client-supplied forwarding headers are not
//! filtered (see DESIGN.md, open question on header pass-through). An
//! `x-request-id` the relay generated for its own logs is dropped; one the
//! client sent is forwarded like any other header.

use axum::http::{header, HeaderMap};

use crate::http::request::{RequestContext, X_REQUEST_ID};

/// Derive the outbound header map from the inbound one.
///
/// Warns when no `Authorization` header is present but does not reject;
/// the dispatcher is the authoritative gate.
pub fn sanitize(inbound: &HeaderMap, ctx: &RequestContext) -> HeaderMap {
    let mut outbound = inbound.clone();
    outbound.remove(header::HOST);
    if ctx.relay_request_id {
        outbound.remove(X_REQUEST_ID);
    }

    if !outbound.contains_key(header::AUTHORIZATION) {
        tracing::warn!(
            request_id = %ctx.request_id,
            client_addr = %ctx.client_addr,
            "Missing Authorization header"
        );
    }

    outbound
}
