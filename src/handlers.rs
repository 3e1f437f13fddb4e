use crate::config::Config;
use crate::errors::AppError;
use crate::models::{AnalyzeCreditRequest, DecisionResult};
use crate::orchestrator::DecisionOrchestrator;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Credit analysis pipeline.
    pub orchestrator: Arc<DecisionOrchestrator>,
    /// Application configuration.
    pub config: Config,
}

/// Routes served by the API, without transport middleware.
pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/credit/analyze", post(analyze_credit))
        .with_state(state)
}

/// Health check endpoint.
///
/// Returns the service status, version and the decision engine it talks to.
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "credit-decision-api",
            "version": env!("CARGO_PKG_VERSION"),
            "decision_engine": {
                "url": state.config.decision_engine_url,
                "timeout_secs": state.config.decision_engine_timeout.map(|t| t.as_secs())
            }
        })),
    )
}

/// POST /api/v1/credit/analyze
///
/// Runs a credit analysis for the user in the request body.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `payload` - Amount, term and the calling user.
///
/// # Returns
///
/// * `Result<Json<DecisionResult>, AppError>` - The decision or an error response.
pub async fn analyze_credit(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AnalyzeCreditRequest>,
) -> Result<Json<DecisionResult>, AppError> {
    tracing::info!(
        "POST /credit/analyze - amount: {}, term: {}",
        payload.amount,
        payload.term
    );

    let result = state
        .orchestrator
        .analyze(&payload.amount, &payload.term, &payload.user)
        .await?;

    Ok(Json(result))
}
