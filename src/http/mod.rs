//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → routes.rs (GET/POST under /v1, body validation, stream flag)
//!     → proxy::headers (sanitize) → proxy::dispatcher (tunnel call)
//!     → response.rs (buffered JSON or event stream)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod routes;
pub mod server;

pub use request::{RequestContext, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
