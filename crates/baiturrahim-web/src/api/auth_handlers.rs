use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use baiturrahim_core::{AuthError, UserProfile};

use crate::auth::middleware::AuthUser;
use crate::dto::*;
use crate::error::AppError;
use crate::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let Json(body) = payload?;

    if !body.email.contains('@') || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "A valid email and a password are required".to_string(),
        ));
    }

    let email = body.email.clone();
    let auth = state.auth.clone();
    let session = tokio::task::spawn_blocking(move || auth.login(&body.email, &body.password))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .inspect_err(|e| {
            if matches!(e, AuthError::InvalidCredentials) {
                tracing::warn!("Failed login attempt for: {email}");
            }
        })?;

    Ok(Json(ApiResponse::ok(session.into(), "Login successful")))
}

pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TokenResponse>>, AppError> {
    let Json(body) = payload?;

    if body.refresh_token.is_empty() {
        return Err(AppError::BadRequest("refresh_token is required".to_string()));
    }

    let pair = state.auth.refresh(&body.refresh_token)?;
    Ok(Json(ApiResponse::ok(pair.into(), "Token refreshed successfully")))
}

pub async fn me(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<UserProfile>>, AppError> {
    let profile = state.auth.profile(principal.user_id)?;
    Ok(Json(ApiResponse::ok(profile, "")))
}

/// Tokens are stateless, so logout only tells the client to drop them.
pub async fn logout(
    AuthUser(principal): AuthUser,
    State(state): State<AppState>,
) -> Json<ApiResponse<()>> {
    state.auth.logout(&principal);
    Json(ApiResponse::message("Logout successful"))
}
