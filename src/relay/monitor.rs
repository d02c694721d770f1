//! Cancellation monitor.
//!
//! Runs next to the byte relay and waits for the caller's disconnect signal.
//! Cancellation is advisory: the relay observes the token between reads, so a
//! read already in flight completes (or times out) before the relay stops.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Wait for `disconnected` and cancel `cancel` when it fires.
///
/// Returns early, without cancelling, once `finished` is cancelled (the relay
/// reached a terminal state on its own). Returns `true` if the caller
/// disconnected.
pub async fn watch<F>(disconnected: F, cancel: CancellationToken, finished: CancellationToken) -> bool
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = finished.cancelled() => false,
        _ = disconnected => {
            tracing::debug!("Caller disconnected, stopping relay");
            cancel.cancel();
            true
        }
    }
}

/// Spawn [`watch`] on its own task.
pub fn spawn<F>(disconnected: F, cancel: CancellationToken, finished: CancellationToken) -> JoinHandle<bool>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(watch(disconnected, cancel, finished))
}
