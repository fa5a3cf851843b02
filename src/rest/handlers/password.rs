use axum::{extract::State, Json};
use chrono::Utc;

use crate::{
    auth::{hash_password, hash_reset_token, is_acceptable_password, ResetToken},
    mailer::{password_reset_email, reset_password_url},
    storage::{Storage, StorageRead, StorageTx, StorageWrite},
};

use super::super::{
    error::ApiError,
    extract::JsonBody,
    models::{ForgotPasswordRequest, MessageResponse, ResetPasswordRequest},
    AppState,
};
use super::non_blank;

const FORGOT_REPLY: &str = "If the email exists, a reset link has been sent";

/// Always answers the same way so callers cannot tell which emails exist.
pub async fn forgot<S: Storage>(
    State(state): State<AppState<S>>,
    JsonBody(request): JsonBody<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Some(email) = non_blank(request.email) else {
        return Err(ApiError::bad_request("Email is required"));
    };

    let now = Utc::now();
    let reset = ResetToken::generate(now);
    let user = {
        let tx = state.storage.begin_tx()?;
        let Some(mut user) = tx.find_user_by_email(&email)? else {
            log::info!("Password reset requested for unknown email");
            return Ok(Json(MessageResponse::new(FORGOT_REPLY)));
        };
        user.reset_token_hash = Some(reset.hash);
        user.reset_token_expires_at = Some(reset.expires_at);
        user.updated_at = now;
        tx.update_user(&user)?;
        tx.commit()?;
        user
    };

    let url = reset_password_url(&state.frontend_url, &reset.token)?;
    let email = password_reset_email(&user.email, &user.first_name, &url);
    match state.mailer.send(email).await {
        Ok(()) => log::info!("✉️ Password reset email sent to user {}", user.id),
        Err(err) => log::error!("Failed to send reset email to user {}: {:?}", user.id, err),
    }

    Ok(Json(MessageResponse::new(FORGOT_REPLY)))
}

pub async fn reset<S: Storage>(
    State(state): State<AppState<S>>,
    JsonBody(request): JsonBody<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = non_blank(request.token);
    let password = request.password.filter(|p| !p.is_empty());
    let (Some(token), Some(password)) = (token, password) else {
        return Err(ApiError::bad_request("Token and password are required"));
    };
    if !is_acceptable_password(&password) {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }

    let password_hash = hash_password(&password)?;
    let now = Utc::now();

    let tx = state.storage.begin_tx()?;
    let user = tx
        .find_user_by_reset_token_hash(&hash_reset_token(&token))?
        .filter(|user| user.reset_token_valid_at(now));
    let Some(mut user) = user else {
        return Err(ApiError::bad_request("Invalid or expired token"));
    };

    user.password_hash = password_hash;
    user.clear_reset_token();
    user.updated_at = now;
    tx.update_user(&user)?;
    tx.commit()?;
    log::info!("🔒 Password reset for user {}", user.id);

    Ok(Json(MessageResponse::new(
        "Password has been reset successfully",
    )))
}
