//! Request-forwarding pipeline.
//!
//! # Data Flow
//! ```text
//! inbound headers → headers.rs (drop Host, warn on missing Authorization)
//!     → dispatcher.rs (auth gate, URL, transport call, status branching)
//!         → 2xx + buffered  → JSON value (or raw-text fallback)
//!         → 2xx + streaming → stream.rs (event-framed lines)
//!         → non-2xx         → upstream status and body, verbatim
//!     → error.rs (ProxyError → status + JSON payload)
//! ```

pub mod dispatcher;
pub mod error;
pub mod headers;
pub mod stream;

pub use dispatcher::{DispatchRequest, Dispatcher, UpstreamResult};
pub use error::ProxyError;
