//! Line framing for streamed upstream bodies.
//!
//! Upstream bytes are split into lines as they arrive; each non-empty line is
//! emitted as `<line>\n\n`. Nothing is held back beyond the current partial
//! line. Dropping an `EventLines` drops the upstream body, which releases the
//! tunnelled connection.

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_util::Stream;

use crate::http::request::RequestContext;
use crate::observability::metrics;
use crate::tunnel::ByteStream;

const DELIMITER: &[u8] = b"\n\n";

/// Why a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    Completed,
    UpstreamError,
    ClientDisconnected,
}

impl StreamEnd {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamEnd::Completed => "completed",
            StreamEnd::UpstreamError => "upstream_error",
            StreamEnd::ClientDisconnected => "client_disconnected",
        }
    }
}

/// Non-restartable producer of event-framed lines.
pub struct EventLines {
    upstream: ByteStream,
    buf: BytesMut,
    /// Prefix of `buf` already known to hold no newline.
    scanned: usize,
    upstream_done: bool,
    end: Option<StreamEnd>,
    lines_sent: u64,
    ctx: RequestContext,
}

impl EventLines {
    pub fn new(upstream: ByteStream, ctx: RequestContext) -> Self {
        Self {
            upstream,
            buf: BytesMut::new(),
            scanned: 0,
            upstream_done: false,
            end: None,
            lines_sent: 0,
            ctx,
        }
    }

    /// Next complete, non-empty line from the buffer.
    fn next_line(&mut self) -> Option<Bytes> {
        while let Some(offset) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
            let pos = self.scanned + offset;
            self.scanned = 0;
            let mut line = self.buf.split_to(pos + 1);
            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            if !line.is_empty() {
                return Some(frame(&line));
            }
        }
        self.scanned = self.buf.len();
        None
    }

    /// Whatever is left once the upstream has closed.
    fn remainder(&mut self) -> Option<Bytes> {
        self.scanned = 0;
        let mut rest = self.buf.split();
        if rest.last() == Some(&b'\r') {
            rest.truncate(rest.len() - 1);
        }
        (!rest.is_empty()).then(|| frame(&rest))
    }

    fn finish(&mut self, end: StreamEnd) {
        if self.end.is_none() {
            self.end = Some(end);
        }
    }
}

fn frame(line: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(line.len() + DELIMITER.len());
    out.extend_from_slice(line);
    out.extend_from_slice(DELIMITER);
    out.freeze()
}

impl Stream for EventLines {
    type Item = Result<Bytes, std::io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(line) = this.next_line() {
                this.lines_sent += 1;
                return Poll::Ready(Some(Ok(line)));
            }
            if this.upstream_done {
                if let Some(line) = this.remainder() {
                    this.lines_sent += 1;
                    return Poll::Ready(Some(Ok(line)));
                }
                this.finish(StreamEnd::Completed);
                return Poll::Ready(None);
            }

            match ready!(this.upstream.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => this.buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    tracing::error!(
                        request_id = %this.ctx.request_id,
                        client_addr = %this.ctx.client_addr,
                        error = %e,
                        "Upstream stream failed"
                    );
                    this.finish(StreamEnd::UpstreamError);
                    this.upstream_done = true;
                    this.buf.clear();
                    this.scanned = 0;
                    return Poll::Ready(Some(Err(std::io::Error::other(e.to_string()))));
                }
                None => this.upstream_done = true,
            }
        }
    }
}

impl Drop for EventLines {
    fn drop(&mut self) {
        let end = self.end.unwrap_or(StreamEnd::ClientDisconnected);
        tracing::info!(
            request_id = %self.ctx.request_id,
            client_addr = %self.ctx.client_addr,
            lines = self.lines_sent,
            reason = end.as_str(),
            "Stream closed"
        );
        metrics::record_stream_closed(end.as_str());
    }
}
