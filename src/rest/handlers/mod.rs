use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::storage::Storage;

use super::{
    models::{ErrorResponse, HealthResponse},
    AppState,
};

pub mod auth;
pub mod comments;
pub mod dashboard;
pub mod issues;
pub mod password;
pub mod projects;
pub mod sprints;
pub mod users;

pub async fn health<S: Storage>(State(state): State<AppState<S>>) -> impl IntoResponse {
    let uptime_secs = state.started_at.elapsed().map(|d| d.as_secs()).unwrap_or(0);
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            uptime_secs,
        }),
    )
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            message: "endpoint not found".to_string(),
        }),
    )
}

/// Trims and drops empty strings, so `"  "` counts as missing.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
