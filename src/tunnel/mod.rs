//! Tunnel transport subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher
//!     → transport.rs (Transport trait; SocksTransport = reqwest + socks5h proxy)
//!     → SOCKS5 endpoint (DNS resolved remotely)
//!     → Upstream API
//!
//! Failures:
//!     reqwest::Error → error.rs (classify) → ProxyError
//! ```
//!
//! # Design Decisions
//! - One client per process, shared by all in-flight requests (pooling is reqwest's concern)
//! - Deadline covers connect + response headers only; streamed bodies are not timed
//! - No retries at this layer or any other

pub mod error;
pub mod transport;

pub use error::{classify, TransportError};
pub use transport::{ByteStream, SocksTransport, Transport, UpstreamCall, UpstreamReply};
