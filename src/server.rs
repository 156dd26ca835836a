//! # Host Bridge
//!
//! An `axum` server standing in for the mail host's plugin hooks. The host
//! reports each stored message to `/hooks/receive-save-after`; the admin UI
//! reads and replaces the panel configuration through `/settings`.
//!
//! The server stops serving once the shutdown channel flips to `true`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::app::AppState;
use crate::core::MailEvent;
use crate::panel::DispatchConfig;

/// Builds the bridge router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/hooks/receive-save-after", post(receive_save_after))
        .route("/settings", get(get_settings).post(update_settings))
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Starts a dispatch for a stored message. The host gets no delivery
/// receipt, only an acknowledgement that the event was taken.
async fn receive_save_after(
    State(state): State<AppState>,
    body: String,
) -> Result<StatusCode, ApiError> {
    let event = if body.trim().is_empty() {
        MailEvent::default()
    } else {
        serde_json::from_str::<MailEvent>(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid event: {}", e)))?
    };
    state.message_stored(event.received_now());
    Ok(StatusCode::ACCEPTED)
}

async fn get_settings(State(state): State<AppState>) -> Json<DispatchConfig> {
    Json(state.store.snapshot().as_ref().clone())
}

/// Replaces the whole panel configuration. Answers `success` or the error
/// text, as the admin UI expects.
async fn update_settings(State(state): State<AppState>, body: String) -> (StatusCode, String) {
    match state.store.apply_update(&body).await {
        Ok(_) => (StatusCode::OK, "success".to_string()),
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()),
    }
}

/// The bridge server and the resources it needs to run.
pub struct HostBridge {
    listener: TcpListener,
    state: AppState,
    shutdown_rx: watch::Receiver<bool>,
}

impl HostBridge {
    /// Creates a new `HostBridge` but does not start it.
    ///
    /// # Arguments
    ///
    /// * `listener` - A `TcpListener` that has already been bound.
    /// * `state` - Shared application state.
    /// * `shutdown_rx` - A watch receiver; `true` stops the server.
    pub fn new(listener: TcpListener, state: AppState, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            listener,
            state,
            shutdown_rx,
        }
    }

    /// Serves requests until shutdown is signalled.
    pub async fn run(self) {
        let Self {
            listener,
            state,
            mut shutdown_rx,
        } = self;

        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "Host bridge listening");
        }

        let shutdown = async move {
            let _ = shutdown_rx.wait_for(|stop| *stop).await;
            debug!("Host bridge received shutdown signal.");
        };

        if let Err(e) = axum::serve(listener, router(state))
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("Host bridge error: {}", e);
        }
        debug!("Host bridge task finished.");
    }
}
