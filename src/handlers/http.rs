//! HTTP front end

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::services::optimizer::{OptimizeError, RouteOptimizer};
use crate::services::reminders;
use crate::types::{DueRemindersRequest, DueRemindersResponse, OptimizeRequest, OptimizeResponse, RouteRequest, RouteResponse};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub optimizer: Arc<RouteOptimizer>,
}

impl OptimizeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OptimizeError::Validation(_) => StatusCode::BAD_REQUEST,
            OptimizeError::UnresolvableLocation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            OptimizeError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            OptimizeError::Provider(_) => StatusCode::BAD_GATEWAY,
            OptimizeError::Infeasible(_) | OptimizeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for OptimizeError {
    fn into_response(self) -> Response {
        if let OptimizeError::Internal(detail) = &self {
            error!("Internal error: {}", detail);
        }
        (
            self.status_code(),
            Json(serde_json::json!({ "error": self.public_message() })),
        )
            .into_response()
    }
}

/// Decode a JSON object body with caller-facing messages.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, OptimizeError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .ok()
        .filter(serde_json::Value::is_object)
        .ok_or_else(|| OptimizeError::Validation("Request body must be JSON.".to_string()))?;

    serde_json::from_value(value).map_err(|e| OptimizeError::Validation(format!("Invalid request body: {}", e)))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/optimize", post(optimize))
        .route("/optimize/route", post(optimize_route))
        .route("/reminders/due", post(reminders_due))
        .with_state(state)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn optimize(State(state): State<AppState>, body: Bytes) -> Result<Json<OptimizeResponse>, OptimizeError> {
    let request: OptimizeRequest = parse_body(&body)?;
    info!(
        "POST /optimize: {} technicians, {} jobs",
        request.technicians.len(),
        request.jobs.len()
    );

    match state.optimizer.optimize(request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            warn!("Optimization failed: {}", e);
            Err(e)
        }
    }
}

pub async fn optimize_route(State(state): State<AppState>, body: Bytes) -> Result<Json<RouteResponse>, OptimizeError> {
    let request: RouteRequest = parse_body(&body)?;
    info!("POST /optimize/route: {} job locations", request.job_locations.len());

    match state.optimizer.optimize_route(request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            warn!("Route optimization failed: {}", e);
            Err(e)
        }
    }
}

pub async fn reminders_due(body: Bytes) -> Result<Json<DueRemindersResponse>, OptimizeError> {
    let request: DueRemindersRequest = parse_body(&body)?;
    let as_of = request.as_of.unwrap_or_else(|| Utc::now().date_naive());

    let due = reminders::due_customers(request.customers, as_of);
    Ok(Json(DueRemindersResponse {
        as_of,
        total_due: due.len(),
        due,
    }))
}

/// Serve HTTP until `shutdown` is cancelled.
pub async fn serve(state: AppState, bind_addr: &str, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("HTTP listening on {}", bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server error")
}
