//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Route layer / dispatcher / stream framing produce:
//!     → logging.rs (structured log events with request_id + client_addr)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (tracing fmt layer)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
