//! Metadata probe.
//!
//! Issues a `HEAD` request with `Icy-MetaData: 1` and keeps only the
//! allowlisted headers the upstream returned with a non-empty value.
//! The response body is never read.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue};
use reqwest::Client;

use crate::relay::allowlist::{IcyHeader, ICY_METADATA_REQUEST};
use crate::relay::error::RelayError;
use crate::relay::session::RelayPhase;
use crate::relay::target::StreamTarget;

/// Allowlisted metadata observed on the probe response.
///
/// Absent or empty upstream headers are not represented at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResult {
    fields: BTreeMap<IcyHeader, HeaderValue>,
}

impl ProbeResult {
    /// Extract the allowlisted subset of an upstream header map.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let fields = IcyHeader::ALL
            .into_iter()
            .filter_map(|h| {
                headers
                    .get(h.as_str())
                    .filter(|v| !v.as_bytes().iter().all(u8::is_ascii_whitespace))
                    .map(|v| (h, v.clone()))
            })
            .collect();
        Self { fields }
    }

    pub fn get(&self, header: IcyHeader) -> Option<&HeaderValue> {
        self.fields.get(&header)
    }

    pub fn iter(&self) -> impl Iterator<Item = (IcyHeader, &HeaderValue)> {
        self.fields.iter().map(|(h, v)| (*h, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy every captured field, verbatim, onto an outbound header map.
    pub fn write_to(&self, headers: &mut HeaderMap) {
        for (h, v) in self.iter() {
            headers.insert(h.header_name(), v.clone());
        }
    }
}

/// Probe the upstream for its metadata headers.
///
/// Transport failures and non-success statuses are fatal for the relay.
pub async fn probe(
    client: &Client,
    target: &StreamTarget,
    timeout: Option<Duration>,
) -> Result<ProbeResult, RelayError> {
    let mut request = client
        .head(target.as_url().clone())
        .header(ICY_METADATA_REQUEST, "1");
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }

    let response = request.send().await.map_err(|source| RelayError::UpstreamConnect {
        phase: RelayPhase::Probing,
        url: target.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(RelayError::UpstreamStatus {
            phase: RelayPhase::Probing,
            url: target.to_string(),
            status,
        });
    }

    let result = ProbeResult::from_headers(response.headers());
    tracing::debug!(
        url = %target,
        fields = result.len(),
        "Probe complete"
    );
    Ok(result)
}
