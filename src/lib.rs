//! SOCKS5-tunnelled REST API relay.
//!
//! Forwards `/v1/*` requests to a single upstream API through a `socks5h`
//! tunnel, relaying buffered JSON and event-stream responses.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod tunnel;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::ProxyError;
