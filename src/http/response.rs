//! Response emission.
//!
//! # Responsibilities
//! - Buffered results: JSON body with the upstream's status
//! - Streamed results: `text/event-stream` body written chunk by chunk
//! - Errors: structured `{"error": ...}` payloads via `ProxyError`
//!
//! # Design Decisions
//! - Streaming responses never collect the body; each framed line is written as it arrives
//! - Intermediary buffering is disabled on streamed responses

use axum::{
    body::Body,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

use crate::http::request::RequestContext;
use crate::proxy::dispatcher::UpstreamResult;
use crate::proxy::error::ProxyError;

pub const EVENT_STREAM: &str = "text/event-stream";

/// Turn a dispatch outcome into the client response.
pub fn emit(outcome: Result<UpstreamResult, ProxyError>, ctx: &RequestContext) -> Response {
    let result = match outcome {
        Ok(result) => result,
        Err(e) => return e.into_response(),
    };

    tracing::debug!(
        request_id = %ctx.request_id,
        client_addr = %ctx.client_addr,
        status = result.status().as_u16(),
        elapsed_ms = result.elapsed().as_millis() as u64,
        "Emitting response"
    );

    match result {
        UpstreamResult::Buffered { status, body, .. } => (status, Json(body)).into_response(),
        UpstreamResult::Streamed { status, lines, .. } => {
            let mut response = Response::new(Body::from_stream(lines));
            *response.status_mut() = status;
            let headers = response.headers_mut();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM));
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::stream::EventLines;
    use axum::http::StatusCode;
    use bytes::Bytes;
    use futures_util::stream;
    use serde_json::json;
    use std::time::Duration;

    fn ctx() -> RequestContext {
        RequestContext {
            request_id: "emit-test".into(),
            client_addr: "127.0.0.1".into(),
            relay_request_id: false,
        }
    }

    #[tokio::test]
    async fn test_buffered_is_json() {
        let response = emit(
            Ok(UpstreamResult::Buffered {
                status: StatusCode::OK,
                body: json!({"object": "list", "data": []}),
                elapsed: Duration::from_millis(3),
            }),
            &ctx(),
        );
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"object": "list", "data": []}));
    }

    #[tokio::test]
    async fn test_streamed_is_event_stream() {
        let upstream = stream::iter(vec![Ok::<_, ProxyError>(Bytes::from_static(b"data: a\ndata: b\n"))]);
        let response = emit(
            Ok(UpstreamResult::Streamed {
                status: StatusCode::OK,
                lines: EventLines::new(Box::pin(upstream), ctx()),
                elapsed: Duration::from_millis(3),
            }),
            &ctx(),
        );
        assert_eq!(response.headers()[header::CONTENT_TYPE], EVENT_STREAM);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"data: a\n\ndata: b\n\n");
    }

    #[tokio::test]
    async fn test_error_is_rendered() {
        let response = emit(Err(ProxyError::MissingCredential), &ctx());
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
