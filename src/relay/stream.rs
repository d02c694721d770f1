//! Byte relay.
//!
//! Opens the streaming `GET` and copies the upstream body to the caller in
//! chunks of at most [`CHUNK_SIZE`] bytes. The outbound side is a
//! [`RelaySink`]; in production this is a capacity-1 channel feeding the HTTP
//! response body, so at most one chunk is ever buffered.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Duration;

use axum::body::Bytes;
use futures_util::{Stream, TryStreamExt};
use reqwest::{Client, RequestBuilder, Response};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use crate::relay::allowlist::ICY_METADATA_REQUEST;
use crate::relay::error::{RelayError, RelayFailure};
use crate::relay::session::{RelayPhase, SessionHandle};
use crate::relay::target::StreamTarget;
use crate::resilience::timeouts::with_deadline;

/// Maximum bytes read from upstream per iteration.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Upstream response body as an async reader.
pub type UpstreamBody =
    StreamReader<Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>, Bytes>;

/// Outbound body stream handed to the HTTP layer.
pub type BodyStream = ReceiverStream<io::Result<Bytes>>;

/// Open the streaming request with metadata interleaving enabled.
///
/// `head_timeout` bounds the wait for the response head only; the body that
/// follows is governed by the per-read deadline of [`RelaySession`].
pub async fn open(
    client: &Client,
    target: &StreamTarget,
    head_timeout: Option<Duration>,
) -> Result<Response, RelayError> {
    let request = client
        .get(target.as_url().clone())
        .header(ICY_METADATA_REQUEST, "1");
    send_for_head(request, target, head_timeout).await
}

/// Send a streaming-phase request and wait for a successful response head.
///
/// A missing head after `head_timeout`, a transport error and a non-2xx
/// status are all errors; the body is left unread.
pub async fn send_for_head(
    request: RequestBuilder,
    target: &StreamTarget,
    head_timeout: Option<Duration>,
) -> Result<Response, RelayError> {
    let sent = match head_timeout {
        Some(limit) => tokio::time::timeout(limit, request.send())
            .await
            .map_err(|_| RelayError::UpstreamTimeout {
                phase: RelayPhase::Streaming,
                url: target.to_string(),
                after: limit,
            })?,
        None => request.send().await,
    };
    let response = sent.map_err(|source| RelayError::UpstreamConnect {
        phase: RelayPhase::Streaming,
        url: target.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(RelayError::UpstreamStatus {
            phase: RelayPhase::Streaming,
            url: target.to_string(),
            status,
        });
    }
    Ok(response)
}

/// Wrap an upstream response body as an `AsyncRead`.
pub fn body_reader(response: Response) -> UpstreamBody {
    let stream: Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>> =
        Box::pin(response.bytes_stream().map_err(io::Error::other));
    StreamReader::new(stream)
}

/// The receiving side of a sink is gone: the caller disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

/// Destination of relayed chunks.
pub trait RelaySink {
    fn send(&mut self, chunk: Bytes) -> impl Future<Output = Result<(), SinkClosed>> + Send;
}

/// Sink backed by a bounded channel whose receiver is the response body.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl ChannelSink {
    /// Create a sink and the body stream it feeds. Capacity is one chunk.
    pub fn new() -> (Self, BodyStream) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, ReceiverStream::new(rx))
    }

    /// Resolves once the body stream has been dropped.
    pub fn disconnected(&self) -> impl Future<Output = ()> + Send + 'static {
        let tx = self.tx.clone();
        async move { tx.closed().await }
    }
}

impl RelaySink for ChannelSink {
    async fn send(&mut self, chunk: Bytes) -> Result<(), SinkClosed> {
        self.tx.send(Ok(chunk)).await.map_err(|_| SinkClosed)
    }
}

/// How a relay loop ended.
#[derive(Debug)]
pub enum RelayOutcome {
    /// Upstream reached end of stream.
    Done,
    /// Caller went away or the cancellation token fired.
    Cancelled,
    /// Upstream read failure after streaming started.
    Failed(RelayFailure),
}

impl RelayOutcome {
    /// Terminal phase this outcome maps to.
    pub fn phase(&self) -> RelayPhase {
        match self {
            RelayOutcome::Done => RelayPhase::Done,
            RelayOutcome::Cancelled => RelayPhase::Cancelled,
            RelayOutcome::Failed(_) => RelayPhase::Error,
        }
    }
}

/// Single-use state of one relay: reader, sink, cancellation token and the
/// running byte count.
pub struct RelaySession<R, S> {
    reader: R,
    sink: S,
    cancel: CancellationToken,
    read_timeout: Option<Duration>,
    bytes: u64,
}

impl<R, S> RelaySession<R, S>
where
    R: AsyncRead + Unpin + Send,
    S: RelaySink + Send,
{
    pub fn new(reader: R, sink: S, cancel: CancellationToken) -> Self {
        Self {
            reader,
            sink,
            cancel,
            read_timeout: None,
            bytes: 0,
        }
    }

    /// Bound each individual upstream read.
    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Copy until EOF, failure or cancellation. Consumes the session, so the
    /// upstream reader is released as soon as this returns.
    pub async fn run(mut self, session: &SessionHandle) -> RelayOutcome {
        let outcome = self.copy(session).await;
        tracing::trace!(
            session_id = %session.id(),
            bytes = self.bytes,
            outcome = %outcome.phase(),
            "Relay loop exited"
        );
        outcome
    }

    async fn copy(&mut self, session: &SessionHandle) -> RelayOutcome {
        let mut buf = vec![0u8; CHUNK_SIZE];

        loop {
            if self.cancel.is_cancelled() {
                return RelayOutcome::Cancelled;
            }

            let n = match with_deadline(self.read_timeout, self.reader.read(&mut buf)).await {
                Ok(n) => n,
                Err(e) => return RelayOutcome::Failed(RelayFailure::Read(e)),
            };

            // A read that was in flight when the caller left is discarded.
            if self.cancel.is_cancelled() {
                return RelayOutcome::Cancelled;
            }
            if n == 0 {
                return RelayOutcome::Done;
            }

            // Cancellation also wins over a write stuck behind a slow caller.
            let sent = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return RelayOutcome::Cancelled,
                sent = self.sink.send(Bytes::copy_from_slice(&buf[..n])) => sent,
            };

            match sent {
                Ok(()) => {
                    self.bytes += n as u64;
                    session.add_bytes(n as u64);
                }
                Err(SinkClosed) => return RelayOutcome::Cancelled,
            }
        }
    }
}
