//! Internet radio stream relay.
//!
//! Lets a client play a remote radio stream through this server: the
//! upstream is probed for its ICY metadata headers, then streamed to the
//! caller chunk by chunk until EOF, failure, or the caller disconnects.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod radio;
pub mod relay;
pub mod resilience;

pub use config::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
