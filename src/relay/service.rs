//! Relay orchestration: probe, open, then hand the body to a relay task.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::config::UpstreamConfig;
use crate::observability::metrics;
use crate::relay::error::RelayError;
use crate::relay::monitor;
use crate::relay::probe::{self, ProbeResult};
use crate::relay::session::{RelayPhase, SessionHandle, SessionId, SessionTracker};
use crate::relay::stream::{self, BodyStream, ChannelSink, RelayOutcome, RelaySession};
use crate::relay::target::StreamTarget;
use crate::resilience::timeouts;

/// Build the upstream HTTP client.
///
/// Idle connections are never kept, so no two sessions share a connection.
pub fn build_client(config: &UpstreamConfig) -> reqwest::Result<Client> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .pool_max_idle_per_host(0);
    if let Some(connect) = timeouts::from_secs(config.connect_timeout_secs) {
        builder = builder.connect_timeout(connect);
    }
    if !config.use_system_proxy {
        builder = builder.no_proxy();
    }
    builder.build()
}

/// Entry point for relaying one upstream stream to one caller.
#[derive(Debug, Clone)]
pub struct RadioRelay {
    client: Client,
    probe_timeout: Option<Duration>,
    open_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    sessions: SessionTracker,
    shutdown: CancellationToken,
}

impl RadioRelay {
    /// `shutdown` is the parent of every session's cancellation token, so
    /// cancelling it stops all running relays.
    pub fn new(
        client: Client,
        config: &UpstreamConfig,
        sessions: SessionTracker,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            client,
            probe_timeout: timeouts::from_secs(config.probe_timeout_secs),
            open_timeout: timeouts::from_secs(config.open_timeout_secs),
            read_timeout: timeouts::from_secs(config.read_timeout_secs),
            sessions,
            shutdown,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Deadline for an upstream response head outside the probe.
    pub fn open_timeout(&self) -> Option<Duration> {
        self.open_timeout
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    /// Probe the upstream, open the stream and start relaying.
    ///
    /// Returns once the response head is known; the body is filled by a
    /// background task that ends on EOF, I/O failure, or caller disconnect.
    pub async fn start(&self, target: StreamTarget) -> Result<RelayStream, RelayError> {
        let session = self.sessions.open(target.as_str());

        session.advance(RelayPhase::Probing);
        let probe = probe::probe(&self.client, &target, self.probe_timeout)
            .await
            .map_err(|e| fail(&session, e))?;

        let response = stream::open(&self.client, &target, self.open_timeout)
            .await
            .map_err(|e| fail(&session, e))?;
        session.advance(RelayPhase::Streaming);

        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();
        let session_id = session.id();

        let (sink, body) = ChannelSink::new();
        let cancel = self.shutdown.child_token();
        let finished = CancellationToken::new();
        monitor::spawn(sink.disconnected(), cancel.clone(), finished.clone());

        let relay = RelaySession::new(stream::body_reader(response), sink, cancel)
            .with_read_timeout(self.read_timeout);

        tokio::spawn(async move {
            let _finished = finished.drop_guard();
            let outcome = relay.run(&session).await;
            if let RelayOutcome::Failed(failure) = &outcome {
                tracing::error!(
                    session_id = %session.id(),
                    url = %target,
                    error = %failure,
                    "Relay stopped"
                );
                metrics::record_upstream_error(RelayPhase::Streaming);
            }
            session.advance(outcome.phase());
        });

        Ok(RelayStream {
            session_id,
            probe,
            content_type,
            body,
        })
    }
}

fn fail(session: &SessionHandle, err: RelayError) -> RelayError {
    tracing::error!(
        session_id = %session.id(),
        url = %session.url(),
        phase = ?err.phase(),
        error = %err,
        "Error fetching stream"
    );
    if let Some(phase) = err.phase() {
        metrics::record_upstream_error(phase);
    }
    session.advance(RelayPhase::Error);
    err
}

/// A started relay: response head plus the body fed by the relay task.
#[derive(Debug)]
pub struct RelayStream {
    pub session_id: SessionId,
    pub probe: ProbeResult,
    pub content_type: Option<HeaderValue>,
    pub body: BodyStream,
}

impl RelayStream {
    /// Allowlisted probe headers followed by the stream's content type.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        self.probe.write_to(&mut headers);
        if let Some(content_type) = &self.content_type {
            headers.insert(header::CONTENT_TYPE, content_type.clone());
        }
        headers
    }
}

impl IntoResponse for RelayStream {
    fn into_response(self) -> Response {
        let headers = self.headers();
        (StatusCode::OK, headers, Body::from_stream(self.body)).into_response()
    }
}
