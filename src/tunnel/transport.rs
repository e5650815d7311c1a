//! Upstream transport routed through a SOCKS5 tunnel.

use std::pin::Pin;
use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use futures_util::{future::BoxFuture, Stream, StreamExt};
use serde_json::Value;

use crate::config::{Socks5Config, UpstreamConfig};
use crate::proxy::error::ProxyError;
use crate::tunnel::error::{classify, TransportError};

/// Upstream body, consumed at most once.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ProxyError>> + Send>>;

/// One outbound call, fully resolved by the dispatcher.
#[derive(Debug, Clone)]
pub struct UpstreamCall {
    pub method: Method,
    /// Absolute URL without the query string.
    pub url: String,
    /// Raw query string, forwarded byte for byte.
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub json_body: Option<Value>,
}

impl UpstreamCall {
    pub fn full_url(&self) -> String {
        match self.query.as_deref() {
            Some(q) if !q.is_empty() => format!("{}?{}", self.url, q),
            _ => self.url.clone(),
        }
    }
}

/// Upstream response head plus an unread body.
pub struct UpstreamReply {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: ByteStream,
}

impl std::fmt::Debug for UpstreamReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamReply")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Something that can carry an `UpstreamCall` to the upstream.
///
/// Shared by every in-flight request, so implementations must be safe for
/// concurrent use.
pub trait Transport: Send + Sync {
    /// Resolves once response headers arrive. The body is left unread.
    fn send(&self, call: UpstreamCall) -> BoxFuture<'_, Result<UpstreamReply, ProxyError>>;
}

/// reqwest client whose every connection goes through a `socks5h://` proxy.
#[derive(Debug, Clone)]
pub struct SocksTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl SocksTransport {
    /// Build the shared client. Fails when the SOCKS5 endpoint is incomplete.
    pub fn new(socks: &Socks5Config, upstream: &UpstreamConfig) -> Result<Self, TransportError> {
        let proxy_url = socks.proxy_url().ok_or(TransportError::MissingEndpoint)?;
        let proxy = reqwest::Proxy::all(&proxy_url).map_err(TransportError::Proxy)?;

        let client = reqwest::Client::builder()
            .proxy(proxy)
            .connect_timeout(Duration::from_secs(upstream.connect_timeout_secs))
            .build()
            .map_err(TransportError::Client)?;

        tracing::info!(
            proxy = %socks.redacted_url().unwrap_or_default(),
            timeout_secs = upstream.timeout_secs,
            "SOCKS5 transport ready"
        );

        Ok(Self {
            client,
            timeout: Duration::from_secs(upstream.timeout_secs),
        })
    }

    async fn execute(&self, call: UpstreamCall) -> Result<UpstreamReply, ProxyError> {
        let url = call.full_url();
        let mut headers = call.headers;
        // Framing belongs to the client; the body is re-encoded below.
        headers.remove(header::CONTENT_LENGTH);
        headers.remove(header::TRANSFER_ENCODING);

        let mut request = self.client.request(call.method, url).headers(headers);
        if let Some(body) = call.json_body.as_ref() {
            request = request.json(body);
        }

        let response = match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(classify(e)),
            Err(_) => return Err(ProxyError::Timeout),
        };

        let status = response.status();
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let body = response.bytes_stream().map(|chunk| chunk.map_err(classify));

        Ok(UpstreamReply {
            status,
            content_type,
            body: Box::pin(body),
        })
    }
}

impl Transport for SocksTransport {
    fn send(&self, call: UpstreamCall) -> BoxFuture<'_, Result<UpstreamReply, ProxyError>> {
        Box::pin(self.execute(call))
    }
}
