//! Per-request relay state machine and the registry of live sessions.
//!
//! ```text
//! Idle → Probing → Streaming → { Done | Error | Cancelled }
//!           └────────────────→ Error
//! ```
//!
//! Every inbound relay request opens exactly one [`SessionHandle`]. The handle
//! is registered in the [`SessionTracker`] until it is dropped, so the admin
//! API and metrics can observe live sessions.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::Serialize;

use crate::observability::metrics;

/// Relaxed: ids only need to be unique.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "relay-{}", self.0)
    }
}

/// Phase of a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayPhase {
    Idle,
    Probing,
    Streaming,
    Done,
    Error,
    Cancelled,
}

impl RelayPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RelayPhase::Done | RelayPhase::Error | RelayPhase::Cancelled)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_advance_to(self, next: RelayPhase) -> bool {
        use RelayPhase::*;
        match (self, next) {
            (Idle, Probing) => true,
            (Probing, Streaming) | (Probing, Error) | (Probing, Cancelled) => true,
            (Streaming, Done) | (Streaming, Error) | (Streaming, Cancelled) => true,
            // Validation failures end a session that never reached the network.
            (Idle, Error) | (Idle, Cancelled) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RelayPhase::Idle => "idle",
            RelayPhase::Probing => "probing",
            RelayPhase::Streaming => "streaming",
            RelayPhase::Done => "done",
            RelayPhase::Error => "error",
            RelayPhase::Cancelled => "cancelled",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            RelayPhase::Idle => 0,
            RelayPhase::Probing => 1,
            RelayPhase::Streaming => 2,
            RelayPhase::Done => 3,
            RelayPhase::Error => 4,
            RelayPhase::Cancelled => 5,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => RelayPhase::Idle,
            1 => RelayPhase::Probing,
            2 => RelayPhase::Streaming,
            3 => RelayPhase::Done,
            4 => RelayPhase::Error,
            _ => RelayPhase::Cancelled,
        }
    }
}

impl std::fmt::Display for RelayPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct SessionEntry {
    id: SessionId,
    url: String,
    started_at: Instant,
    started_unix_secs: u64,
    phase: AtomicU8,
    bytes: AtomicU64,
}

impl SessionEntry {
    fn phase(&self) -> RelayPhase {
        RelayPhase::from_u8(self.phase.load(Ordering::Acquire))
    }
}

/// Point-in-time view of a live session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub url: String,
    pub phase: RelayPhase,
    pub bytes: u64,
    pub started_at: u64,
    pub elapsed_secs: f64,
}

/// Registry of live relay sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    sessions: Arc<DashMap<SessionId, Arc<SessionEntry>>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session in the `Idle` phase.
    pub fn open(&self, url: &str) -> SessionHandle {
        let entry = Arc::new(SessionEntry {
            id: SessionId::new(),
            url: url.to_string(),
            started_at: Instant::now(),
            started_unix_secs: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            phase: AtomicU8::new(RelayPhase::Idle.to_u8()),
            bytes: AtomicU64::new(0),
        });
        self.sessions.insert(entry.id, Arc::clone(&entry));
        metrics::set_active_sessions(self.sessions.len());

        SessionHandle {
            entry,
            sessions: Arc::clone(&self.sessions),
        }
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn snapshot(&self) -> Vec<SessionSnapshot> {
        let mut out: Vec<SessionSnapshot> = self
            .sessions
            .iter()
            .map(|e| SessionSnapshot {
                id: e.id,
                url: e.url.clone(),
                phase: e.phase(),
                bytes: e.bytes.load(Ordering::Relaxed),
                started_at: e.started_unix_secs,
                elapsed_secs: e.started_at.elapsed().as_secs_f64(),
            })
            .collect();
        out.sort_by_key(|s| s.id.as_u64());
        out
    }
}

/// Owner of one session's registry entry. Deregisters on drop.
///
/// A handle dropped before reaching a terminal phase (for instance because the
/// caller went away while the probe was in flight) is recorded as cancelled.
#[derive(Debug)]
pub struct SessionHandle {
    entry: Arc<SessionEntry>,
    sessions: Arc<DashMap<SessionId, Arc<SessionEntry>>>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.entry.id
    }

    pub fn url(&self) -> &str {
        &self.entry.url
    }

    pub fn phase(&self) -> RelayPhase {
        self.entry.phase()
    }

    pub fn bytes(&self) -> u64 {
        self.entry.bytes.load(Ordering::Relaxed)
    }

    pub fn add_bytes(&self, n: u64) {
        self.entry.bytes.fetch_add(n, Ordering::Relaxed);
    }

    /// Move to `next`. Returns `false` and leaves the phase unchanged if the
    /// state machine does not allow the transition.
    pub fn advance(&self, next: RelayPhase) -> bool {
        let current = self.phase();
        if !current.can_advance_to(next) {
            tracing::warn!(
                session_id = %self.entry.id,
                from = %current,
                to = %next,
                "Rejected relay phase transition"
            );
            return false;
        }
        self.entry.phase.store(next.to_u8(), Ordering::Release);
        tracing::debug!(session_id = %self.entry.id, from = %current, to = %next, "Relay phase changed");

        if next.is_terminal() {
            let elapsed = self.entry.started_at.elapsed();
            metrics::record_session(next, elapsed, self.bytes());
            tracing::info!(
                session_id = %self.entry.id,
                url = %self.entry.url,
                outcome = %next,
                bytes = self.bytes(),
                duration_ms = elapsed.as_millis() as u64,
                "Relay session closed"
            );
        }
        true
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if !self.phase().is_terminal() {
            self.advance(RelayPhase::Cancelled);
        }
        self.sessions.remove(&self.entry.id);
        metrics::set_active_sessions(self.sessions.len());
    }
}
