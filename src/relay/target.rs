//! Upstream locator validation.

use url::Url;

use crate::relay::error::RelayError;

/// A validated, absolute upstream URL.
///
/// Constructing one never touches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTarget(Url);

impl StreamTarget {
    /// Validate the `url` request parameter.
    ///
    /// `param` has already been percent-decoded once by the query extractor
    /// and is not decoded again: escapes that remain (`%2F`, `%26`, ...) are
    /// part of the upstream URL and reach the upstream unchanged. A second
    /// unescape pass, and the 400 it could produce on a malformed escape,
    /// is deliberately not applied.
    pub fn from_param(param: Option<&str>) -> Result<Self, RelayError> {
        let raw = match param.map(str::trim) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Err(RelayError::Validation("required 'url' parameter not found".into())),
        };

        let url = Url::parse(raw)
            .map_err(|e| RelayError::Validation(format!("invalid url '{}': {}", raw, e)))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(RelayError::Validation(format!(
                    "unsupported url scheme '{}'",
                    other
                )))
            }
        }

        if url.host_str().is_none() {
            return Err(RelayError::Validation(format!("url '{}' has no host", raw)));
        }

        Ok(Self(url))
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for StreamTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}
