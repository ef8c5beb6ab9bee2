use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.app_name,
        "version": env!("CARGO_PKG_VERSION")
    }))
}
