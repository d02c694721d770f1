//! Timeout enforcement for upstream I/O.
//!
//! Each individual operation gets an optional deadline. `None` means the
//! operation may block for as long as the transport allows. Timeouts surface
//! as `io::ErrorKind::TimedOut` so callers treat them like any other I/O
//! failure.

use std::future::Future;
use std::io;
use std::time::Duration;

/// Convert a seconds setting into an optional deadline (0 = disabled).
pub fn from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Run an I/O future under an optional deadline.
pub async fn with_deadline<F, T>(limit: Option<Duration>, fut: F) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no data within {:?}", limit),
            )),
        },
        None => fut.await,
    }
}
