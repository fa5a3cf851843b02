use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::{auth::verify_password, storage::Storage};

use super::super::{
    error::ApiError,
    models::{LoginRequest, TokenResponse},
    AppState,
};
use super::non_blank;

pub async fn login<S: Storage>(
    State(state): State<AppState<S>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|_| ApiError::Unauthorized("Invalid JSON payload".to_string()))?;

    let (Some(email), Some(password)) = (non_blank(request.email), request.password) else {
        return Err(ApiError::Unauthorized(
            "Email and password are required".to_string(),
        ));
    };
    if password.is_empty() {
        return Err(ApiError::Unauthorized(
            "Email and password are required".to_string(),
        ));
    }

    let user = state
        .storage
        .find_user_by_email(&email)?
        .filter(|user| user.has_password() && verify_password(&password, &user.password_hash));
    let Some(user) = user else {
        log::info!("Rejected login for {}", email);
        return Err(ApiError::Unauthorized("Invalid credentials.".to_string()));
    };

    let token = state.jwt.issue(&user)?;
    log::info!("🔑 User {} logged in", user.id);
    Ok(Json(TokenResponse { token }))
}
