//! Upstream dispatch.
//!
//! # Responsibilities
//! - Authoritative `Authorization` gate (nothing reaches the tunnel without it)
//! - Build the outbound URL and attach JSON content type when a body is sent
//! - Time every upstream call and classify failures
//! - Choose buffered JSON or streamed lines for successful responses
//!
//! # Design Decisions
//! - No retries: the first failure is the answer
//! - Non-2xx upstream responses are passed through with their own status and body
//! - A 2xx body that is not JSON degrades to a raw-text payload (500) instead of a transport error

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::http::request::RequestContext;
use crate::observability::metrics;
use crate::proxy::error::ProxyError;
use crate::proxy::stream::EventLines;
use crate::tunnel::{ByteStream, Transport, UpstreamCall};

/// Everything the route layer hands to the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: Method,
    /// Path below the versioned prefix, without a leading slash.
    pub endpoint_path: String,
    pub headers: HeaderMap,
    pub json_body: Option<Value>,
    pub query: Option<String>,
    pub streaming: bool,
}

/// Outcome of a successful upstream call, consumed once by the emitter.
pub enum UpstreamResult {
    Buffered {
        status: StatusCode,
        body: Value,
        elapsed: Duration,
    },
    Streamed {
        status: StatusCode,
        lines: EventLines,
        elapsed: Duration,
    },
}

impl UpstreamResult {
    pub fn status(&self) -> StatusCode {
        match self {
            UpstreamResult::Buffered { status, .. } | UpstreamResult::Streamed { status, .. } => {
                *status
            }
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            UpstreamResult::Buffered { elapsed, .. } | UpstreamResult::Streamed { elapsed, .. } => {
                *elapsed
            }
        }
    }
}

/// Forwards requests to the single configured upstream.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    base_url: String,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, upstream: &UpstreamConfig) -> Self {
        Self {
            transport,
            base_url: upstream.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(upstream.timeout_secs),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn dispatch(
        &self,
        request: DispatchRequest,
        ctx: &RequestContext,
    ) -> Result<UpstreamResult, ProxyError> {
        if !request.headers.contains_key(header::AUTHORIZATION) {
            tracing::warn!(
                request_id = %ctx.request_id,
                client_addr = %ctx.client_addr,
                "Rejecting request without Authorization header"
            );
            return Err(ProxyError::MissingCredential);
        }

        let mut headers = request.headers;
        if request.json_body.is_some() {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }

        let call = UpstreamCall {
            method: request.method.clone(),
            url: format!("{}/{}", self.base_url, request.endpoint_path),
            query: request.query,
            headers,
            json_body: request.json_body,
        };

        tracing::info!(
            request_id = %ctx.request_id,
            client_addr = %ctx.client_addr,
            method = %call.method,
            endpoint = %request.endpoint_path,
            streaming = request.streaming,
            "Proxying request"
        );

        let start = Instant::now();
        let outcome = self.transport.send(call).await;
        let elapsed = start.elapsed();

        let reply = match outcome {
            Ok(reply) => {
                tracing::info!(
                    request_id = %ctx.request_id,
                    client_addr = %ctx.client_addr,
                    status = reply.status.as_u16(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Upstream responded"
                );
                metrics::record_upstream(request.method.as_str(), reply.status.as_u16(), elapsed);
                reply
            }
            Err(e) => {
                tracing::error!(
                    request_id = %ctx.request_id,
                    client_addr = %ctx.client_addr,
                    endpoint = %request.endpoint_path,
                    kind = e.kind(),
                    error = %e,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Upstream call failed"
                );
                metrics::record_upstream(request.method.as_str(), e.status().as_u16(), elapsed);
                return Err(e);
            }
        };

        if !reply.status.is_success() {
            let body = self.read_body(reply.body).await?;
            tracing::error!(
                request_id = %ctx.request_id,
                client_addr = %ctx.client_addr,
                endpoint = %request.endpoint_path,
                status = reply.status.as_u16(),
                "Upstream returned error status"
            );
            return Err(ProxyError::UpstreamHttp {
                status: reply.status,
                body,
                content_type: reply.content_type,
            });
        }

        if request.streaming {
            return Ok(UpstreamResult::Streamed {
                status: reply.status,
                lines: EventLines::new(reply.body, ctx.clone()),
                elapsed,
            });
        }

        let raw = self.read_body(reply.body).await?;
        match serde_json::from_slice::<Value>(&raw) {
            Ok(body) => Ok(UpstreamResult::Buffered {
                status: reply.status,
                body,
                elapsed,
            }),
            Err(e) => {
                tracing::error!(
                    request_id = %ctx.request_id,
                    client_addr = %ctx.client_addr,
                    endpoint = %request.endpoint_path,
                    error = %e,
                    body_len = raw.len(),
                    "Upstream returned invalid JSON"
                );
                Err(ProxyError::malformed_upstream(&raw))
            }
        }
    }

    /// Read a whole body, bounded by the upstream deadline.
    async fn read_body(&self, body: ByteStream) -> Result<Bytes, ProxyError> {
        tokio::time::timeout(self.timeout, collect(body))
            .await
            .map_err(|_| ProxyError::Timeout)?
    }
}

async fn collect(mut body: ByteStream) -> Result<Bytes, ProxyError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}
