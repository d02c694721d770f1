//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream call:
//!     → connect timeout (reqwest client builder)
//!     → probe timeout (whole HEAD request)
//!     → timeouts.rs (per-chunk read deadline while streaming)
//! ```
//!
//! # Design Decisions
//! - No retries: a single failed attempt ends the relay session
//! - Every deadline is optional and configured in `[upstream]`

pub mod timeouts;
