//! Radio station records.
//!
//! Plain CRUD over a [`RadioRepository`]; the relay does not depend on it.

pub mod handlers;
pub mod model;
pub mod store;

use axum::{routing::get, Router};

use crate::http::server::AppState;
use self::handlers::*;

pub use model::Radio;
pub use store::{InMemoryRadioRepository, RadioRepository, StoreError};

pub fn radio_routes() -> Router<AppState> {
    Router::new()
        .route("/rest/getInternetRadioStations", get(get_radios))
        .route("/rest/createInternetRadioStation", get(create_radio).post(create_radio))
        .route("/rest/updateInternetRadioStation", get(update_radio).post(update_radio))
        .route("/rest/deleteInternetRadioStation", get(delete_radio).post(delete_radio))
}
