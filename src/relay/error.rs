//! Relay error types.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::relay::session::RelayPhase;

/// Errors that end a relay before any audio byte is sent.
///
/// These always produce a complete HTTP error response.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Missing or malformed `url` parameter. No network call was made.
    #[error("{0}")]
    Validation(String),

    /// The upstream could not be reached during the given phase.
    #[error("error fetching stream {url}: {source}")]
    UpstreamConnect {
        phase: RelayPhase,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream accepted the request but sent no response head in time.
    #[error("error fetching stream {url}: no response within {after:?}")]
    UpstreamTimeout {
        phase: RelayPhase,
        url: String,
        after: Duration,
    },

    /// The upstream answered with a non-success status.
    #[error("upstream {url} answered {status}")]
    UpstreamStatus {
        phase: RelayPhase,
        url: String,
        status: StatusCode,
    },
}

impl RelayError {
    /// HTTP status returned to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::UpstreamConnect { .. }
            | RelayError::UpstreamTimeout { .. }
            | RelayError::UpstreamStatus { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Phase the failure happened in, if it reached the network.
    pub fn phase(&self) -> Option<RelayPhase> {
        match self {
            RelayError::Validation(_) => None,
            RelayError::UpstreamConnect { phase, .. }
            | RelayError::UpstreamTimeout { phase, .. }
            | RelayError::UpstreamStatus { phase, .. } => Some(*phase),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Failure after streaming has begun. Only logged; the caller already has
/// headers and possibly bytes, so the connection is simply ended.
///
/// Writes toward the caller have no failure of their own: the HTTP server
/// drops the body when the connection breaks, which the relay sees as a
/// closed sink and treats as cancellation.
#[derive(Debug, Error)]
pub enum RelayFailure {
    #[error("error reading data: {0}")]
    Read(#[source] std::io::Error),
}
