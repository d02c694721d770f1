//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Relay sessions, HTTP layer, config reloads produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every upstream failure is logged with the target URL
//! - Caller disconnects are normal and logged at debug, not as errors
//! - Request ID (x-request-id) is attached to every HTTP span

pub mod logging;
pub mod metrics;
