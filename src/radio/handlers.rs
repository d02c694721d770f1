use axum::{
    extract::{FromRequest, Query, Request, State},
    http::{header::CONTENT_TYPE, Method, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use thiserror::Error;

use crate::http::server::AppState;
use crate::radio::model::Radio;
use crate::radio::store::StoreError;

/// Query parameters accepted by the station endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadioParams {
    pub id: Option<String>,
    pub name: Option<String>,
    pub stream_url: Option<String>,
    pub homepage_url: Option<String>,
}

impl RadioParams {
    /// Fields set in `other` win over those in `self`.
    fn merged_with(self, other: RadioParams) -> Self {
        Self {
            id: other.id.or(self.id),
            name: other.name.or(self.name),
            stream_url: other.stream_url.or(self.stream_url),
            homepage_url: other.homepage_url.or(self.homepage_url),
        }
    }
}

/// Station parameters from the query string and, for a form-encoded POST,
/// from the body as well. Body fields override query fields.
#[derive(Debug)]
pub struct StationParams(pub RadioParams);

fn is_form_post(request: &Request) -> bool {
    request.method() == Method::POST
        && request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

impl<S> FromRequest<S> for StationParams
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) =
            Query::<RadioParams>::try_from_uri(request.uri()).map_err(IntoResponse::into_response)?;
        if !is_form_post(&request) {
            return Ok(Self(query));
        }

        let Form(form) = Form::<RadioParams>::from_request(request, state)
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(Self(query.merged_with(form)))
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("required '{0}' parameter is missing")]
    MissingParameter(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ApiError::MissingParameter(name))
}

fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn get_radios(State(state): State<AppState>) -> Json<Vec<Radio>> {
    Json(state.radios.get_all())
}

pub async fn create_radio(
    State(state): State<AppState>,
    StationParams(params): StationParams,
) -> Result<Json<Radio>, ApiError> {
    let radio = Radio {
        id: String::new(),
        stream_url: required(params.stream_url, "streamUrl")?,
        name: required(params.name, "name")?,
        homepage_url: optional(params.homepage_url),
    };
    let stored = state.radios.put(radio)?;
    tracing::info!(id = %stored.id, name = %stored.name, "Radio created");
    Ok(Json(stored))
}

pub async fn update_radio(
    State(state): State<AppState>,
    StationParams(params): StationParams,
) -> Result<Json<Radio>, ApiError> {
    let radio = Radio {
        id: required(params.id, "id")?,
        stream_url: required(params.stream_url, "streamUrl")?,
        name: required(params.name, "name")?,
        homepage_url: optional(params.homepage_url),
    };
    let stored = state.radios.put(radio)?;
    tracing::info!(id = %stored.id, name = %stored.name, "Radio updated");
    Ok(Json(stored))
}

pub async fn delete_radio(
    State(state): State<AppState>,
    StationParams(params): StationParams,
) -> Result<StatusCode, ApiError> {
    let id = required(params.id, "id")?;
    state.radios.delete(&id)?;
    tracing::info!(id = %id, "Radio deleted");
    Ok(StatusCode::NO_CONTENT)
}
