//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID; timeout on the station API)
//! - Bind server to listener, optional admin listener
//! - Apply configuration reloads (new upstream client)
//! - Stop running relays on shutdown so connections can drain

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{body::Body, routing::get, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::RelayConfig;
use crate::http::handlers::{proxy_icon, proxy_radio};
use crate::http::request::{make_span, X_REQUEST_ID};
use crate::radio::{radio_routes, InMemoryRadioRepository, RadioRepository};
use crate::relay::{build_client, RadioRelay, SessionTracker};

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings that can change on config reload.
#[derive(Debug)]
pub struct RuntimeState {
    pub config: RelayConfig,
    pub relay: RadioRelay,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<RuntimeState>>,
    pub sessions: SessionTracker,
    pub radios: Arc<dyn RadioRepository>,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: RelayConfig, radios: Arc<dyn RadioRepository>) -> Result<Self, ServerError> {
        let sessions = SessionTracker::new();
        let shutdown = CancellationToken::new();
        let runtime = Self::runtime(config, &sessions, &shutdown)?;
        Ok(Self {
            inner: Arc::new(ArcSwap::from_pointee(runtime)),
            sessions,
            radios,
            shutdown,
        })
    }

    fn runtime(
        config: RelayConfig,
        sessions: &SessionTracker,
        shutdown: &CancellationToken,
    ) -> Result<RuntimeState, ServerError> {
        let client = build_client(&config.upstream)?;
        let relay = RadioRelay::new(client, &config.upstream, sessions.clone(), shutdown.clone());
        Ok(RuntimeState { config, relay })
    }

    /// Swap in a new configuration. Running sessions are unaffected.
    pub fn reload(&self, config: RelayConfig) -> Result<(), ServerError> {
        let runtime = Self::runtime(config, &self.sessions, &self.shutdown)?;
        self.inner.store(Arc::new(runtime));
        Ok(())
    }

    /// Cancel every running relay.
    pub fn stop_relays(&self) {
        self.shutdown.cancel();
    }
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    state: AppState,
    config: RelayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with an in-memory station repository.
    pub fn new(config: RelayConfig) -> Result<Self, ServerError> {
        Self::with_repository(config, Arc::new(InMemoryRadioRepository::new()))
    }

    pub fn with_repository(
        config: RelayConfig,
        radios: Arc<dyn RadioRepository>,
    ) -> Result<Self, ServerError> {
        let state = AppState::new(config.clone(), radios)?;
        let router = Self::build_router(&config, state.clone());
        Ok(Self {
            router,
            state,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        // Proxy routes carry their own upstream deadlines ([upstream]).
        let proxy = Router::new()
            .route("/proxy/radio", get(proxy_radio))
            .route("/proxy/icon", get(proxy_icon));
        let api = radio_routes()
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .merge(proxy)
            .merge(api)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(make_span::<Body>))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            )
    }

    /// Live relay sessions.
    pub fn sessions(&self) -> SessionTracker {
        self.state.sessions.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Configuration updates received on `config_updates` replace the
    /// upstream client for new sessions.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let admin_stop = CancellationToken::new();
        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
            let admin = setup_admin_router(self.state.clone());
            let stop = admin_stop.clone();
            tokio::spawn(async move {
                if let Err(e) = axum::serve(admin_listener, admin)
                    .with_graceful_shutdown(stop.cancelled_owned())
                    .await
                {
                    tracing::error!(error = %e, "Admin API stopped");
                }
            });
        }

        let reload_state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match reload_state.reload(config) {
                    Ok(()) => tracing::info!("Configuration reloaded"),
                    Err(e) => tracing::error!(error = %e, "Failed to apply configuration"),
                }
            }
        });

        let state = self.state.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
                state.stop_relays();
                admin_stop.cancel();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
