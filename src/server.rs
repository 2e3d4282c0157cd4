//! HTTP surface: `GET /health` and `POST /phrase`.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::PhraserConfig;
use crate::health::{self, HealthReport};
use crate::service::{PhraseRequest, PhraserOutput, PhrasingService};

/// Detail returned for every server-side failure.
pub const INTERNAL_ERROR_DETAIL: &str = "An internal server error occurred";

type AppState = Arc<PhrasingService>;

/// JSON error body, `{"detail": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable reason.
    pub detail: String,
}

/// Errors returned by the HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The request was malformed or invalid.
    Validation {
        /// Status to return (4xx).
        status: StatusCode,
        /// Safe, client-facing reason.
        detail: String,
    },
    /// Something failed server-side; the cause is logged, not returned.
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Validation { status, detail } => (status, detail),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_DETAIL.to_owned(),
            ),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

/// Build the application router.
pub fn router(service: PhrasingService, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/phrase", post(generate_phrase))
        .with_state(Arc::new(service))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> Json<HealthReport> {
    Json(health::report())
}

async fn generate_phrase(
    State(service): State<AppState>,
    payload: Result<Json<PhraseRequest>, JsonRejection>,
) -> Result<Json<PhraserOutput>, ApiError> {
    let request_id = Uuid::new_v4();

    let Json(request) = payload.map_err(|rejection| {
        warn!(%request_id, error = %rejection, "rejected malformed phrase request");
        ApiError::Validation {
            status: rejection_status(&rejection),
            detail: rejection.body_text(),
        }
    })?;

    let input = request.into_input().map_err(|e| {
        warn!(%request_id, error = %e, "rejected invalid phrase request");
        ApiError::Validation {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: e.to_string(),
        }
    })?;

    let span = info_span!("phrase", %request_id, decision_key = %input.decision_key);
    async move {
        match service.phrase(&input).await {
            Ok(output) => {
                info!("phrase request served");
                Ok(Json(output))
            }
            Err(e) => {
                error!(error = %e, "phrase request failed");
                Err(ApiError::Internal)
            }
        }
    }
    .instrument(span)
    .await
}

/// Body too large and wrong content type keep their status; every other
/// body problem is a validation failure.
fn rejection_status(rejection: &JsonRejection) -> StatusCode {
    match rejection.status() {
        status @ (StatusCode::PAYLOAD_TOO_LARGE | StatusCode::UNSUPPORTED_MEDIA_TYPE) => status,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

/// Serve `app` on `listener` until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the server fails while running.
pub async fn serve(listener: TcpListener, app: Router) -> anyhow::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

/// Build the service from `config`, bind, and serve.
///
/// # Errors
///
/// Returns an error if the service cannot be built, the address cannot be
/// bound, or the server fails.
pub async fn run(config: &PhraserConfig) -> anyhow::Result<()> {
    let service = PhrasingService::from_config(config)?;
    let app = router(service, config.server.max_body_bytes);

    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    info!(addr = %config.server.bind, "llm-phraser listening");

    serve(listener, app).await?;
    info!("llm-phraser stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received, draining requests");
}
