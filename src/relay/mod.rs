//! Internet radio stream relay.
//!
//! # Data Flow
//! ```text
//! GET /proxy/radio?url=...
//!     → target.rs (validate url, no network)
//!     → probe.rs (HEAD + Icy-MetaData: 1, keep allowlisted headers)
//!     → stream.rs (GET + Icy-MetaData: 1, copy body in 8 KiB chunks)
//!           ↑
//!     monitor.rs (caller disconnect → cancel token)
//! ```
//!
//! # Design Decisions
//! - Probe and stream are separate phases of one per-request state machine
//!   (session.rs), each with its own timeout policy
//! - The outbound body is a capacity-1 channel: nothing is buffered beyond
//!   one chunk, and a dropped body is the caller's disconnect signal
//! - No retries: the first failure ends the session

pub mod allowlist;
pub mod error;
pub mod monitor;
pub mod probe;
pub mod service;
pub mod session;
pub mod stream;
pub mod target;

pub use allowlist::IcyHeader;
pub use error::{RelayError, RelayFailure};
pub use probe::ProbeResult;
pub use service::{build_client, RadioRelay, RelayStream};
pub use session::{RelayPhase, SessionHandle, SessionId, SessionSnapshot, SessionTracker};
pub use stream::CHUNK_SIZE;
pub use target::StreamTarget;
