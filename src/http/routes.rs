//! Route layer: `GET` and `POST` under `/v1/{*path}`.
//!
//! # Responsibilities
//! - Derive the endpoint path (everything after `/v1/`) without re-encoding
//! - GET: forward the raw query string, never stream, never send a body
//! - POST: require a JSON body, read its `stream` flag, forward the body unchanged
//!
//! # Design Decisions
//! - Body validation happens before dispatch; a bad body never reaches the tunnel
//! - The `stream` field stays in the forwarded body

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::http::request::RequestContext;
use crate::http::response::emit;
use crate::http::server::AppState;
use crate::proxy::dispatcher::DispatchRequest;
use crate::proxy::error::ProxyError;
use crate::proxy::headers::sanitize;

/// Versioned prefix all proxied routes live under.
pub const API_PREFIX: &str = "/v1/";

pub async fn proxy_get(State(state): State<AppState>, request: Request<Body>) -> Response {
    let ctx = RequestContext::from_request(&request);
    let uri = request.uri();

    let dispatch = DispatchRequest {
        method: Method::GET,
        endpoint_path: endpoint_path(uri),
        headers: sanitize(request.headers(), &ctx),
        json_body: None,
        query: uri.query().map(str::to_string),
        streaming: false,
    };

    emit(state.dispatcher.dispatch(dispatch, &ctx).await, &ctx)
}

pub async fn proxy_post(State(state): State<AppState>, request: Request<Body>) -> Response {
    let ctx = RequestContext::from_request(&request);
    let (parts, body) = request.into_parts();
    let endpoint = endpoint_path(&parts.uri);

    let json_body = match read_json_body(body, state.max_body_bytes).await {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(
                request_id = %ctx.request_id,
                client_addr = %ctx.client_addr,
                endpoint = %endpoint,
                error = %e,
                "Invalid JSON data"
            );
            return e.into_response();
        }
    };

    let dispatch = DispatchRequest {
        method: Method::POST,
        endpoint_path: endpoint,
        headers: sanitize(&parts.headers, &ctx),
        streaming: stream_requested(&json_body),
        json_body: Some(json_body),
        query: parts.uri.query().map(str::to_string),
    };

    emit(state.dispatcher.dispatch(dispatch, &ctx).await, &ctx)
}

/// Liveness check; never touches the upstream.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Path below the versioned prefix, exactly as received.
pub fn endpoint_path(uri: &Uri) -> String {
    let path = uri.path();
    path.strip_prefix(API_PREFIX)
        .unwrap_or_else(|| path.trim_start_matches('/'))
        .to_string()
}

async fn read_json_body(body: Body, limit: usize) -> Result<Value, ProxyError> {
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| ProxyError::MalformedRequestBody(e.to_string()))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ProxyError::MalformedRequestBody("body is empty".to_string()));
    }
    match serde_json::from_slice(&bytes) {
        Ok(Value::Null) => Err(ProxyError::MalformedRequestBody("body is null".to_string())),
        Ok(value) => Ok(value),
        Err(e) => Err(ProxyError::MalformedRequestBody(e.to_string())),
    }
}

/// Truthiness of the body's `stream` field; absent means `false`.
pub fn stream_requested(body: &Value) -> bool {
    match body.get("stream") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}
