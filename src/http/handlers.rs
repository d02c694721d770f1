//! Proxy endpoints: radio streams and station icons.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::http::server::AppState;
use crate::relay::stream;
use crate::relay::{RelayError, RelayStream, StreamTarget};

/// The single `url` parameter, already percent-decoded by the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct UrlParams {
    pub url: Option<String>,
}

fn target_from(params: &UrlParams) -> Result<StreamTarget, RelayError> {
    StreamTarget::from_param(params.url.as_deref()).inspect_err(|e| {
        tracing::warn!(url = ?params.url, error = %e, "Bad stream url");
    })
}

/// `GET /proxy/radio?url=...`
pub async fn proxy_radio(
    State(state): State<AppState>,
    Query(params): Query<UrlParams>,
) -> Result<RelayStream, RelayError> {
    let target = target_from(&params)?;
    let inner = state.inner.load_full();
    inner.relay.start(target).await
}

/// `GET /proxy/icon?url=...`
///
/// One plain GET; the body is streamed back with the upstream content type.
pub async fn proxy_icon(
    State(state): State<AppState>,
    Query(params): Query<UrlParams>,
) -> Result<Response, RelayError> {
    let target = target_from(&params)?;
    let inner = state.inner.load_full();

    let request = inner.relay.client().get(target.as_url().clone());
    let response = stream::send_for_head(request, &target, inner.relay.open_timeout())
        .await
        .inspect_err(|e| tracing::error!(url = %target, error = %e, "Error fetching icon"))?;

    let mut headers = HeaderMap::new();
    if let Some(content_type) = response.headers().get(header::CONTENT_TYPE) {
        headers.insert(header::CONTENT_TYPE, content_type.clone());
    }
    Ok((StatusCode::OK, headers, Body::from_stream(response.bytes_stream())).into_response())
}
