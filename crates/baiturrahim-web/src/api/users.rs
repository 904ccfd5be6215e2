use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use baiturrahim_core::{NewUser, Role, UserFilter, UserProfile, UserUpdate};
use uuid::Uuid;

use crate::auth::middleware::AdminUser;
use crate::dto::{ApiResponse, ListUsersQuery, Page, PaginatedResponse};
use crate::error::AppError;
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

pub async fn list_users(
    _admin: AdminUser,
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<PaginatedResponse<UserProfile>>, AppError> {
    let filter = UserFilter {
        role: query
            .role
            .as_deref()
            .filter(|r| !r.is_empty())
            .map(str::parse::<Role>)
            .transpose()?,
        is_active: query
            .is_active
            .as_deref()
            .filter(|a| !a.is_empty())
            .map(|a| a == "true"),
    };
    let page = Page::from_query(query.page.as_deref(), query.limit.as_deref());

    let users = state.auth.list_users(&filter)?;
    Ok(Json(PaginatedResponse::paginate(users, page)))
}

pub async fn create_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>), AppError> {
    let Json(new_user) = payload?;

    if new_user.username.trim().is_empty() || new_user.full_name.trim().is_empty() {
        return Err(AppError::BadRequest("username and full_name are required".to_string()));
    }
    if !new_user.email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }
    if new_user.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let auth = state.auth.clone();
    let profile = tokio::task::spawn_blocking(move || auth.create_user(new_user))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    tracing::info!(created_by = %admin.user_id, user_id = %profile.id, "User created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(profile, "User created successfully")),
    ))
}

pub async fn update_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UserUpdate>, JsonRejection>,
) -> Result<Json<ApiResponse<UserProfile>>, AppError> {
    let Path(id) = id?;
    let Json(update) = payload?;

    if update
        .email
        .as_deref()
        .is_some_and(|e| !e.is_empty() && !e.contains('@'))
    {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }

    let profile = state.auth.update_user(id, update)?;
    tracing::info!(updated_by = %admin.user_id, user_id = %id, "User updated");
    Ok(Json(ApiResponse::ok(profile, "User updated successfully")))
}

pub async fn delete_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let Path(id) = id?;
    state.auth.delete_user(id)?;
    tracing::info!(deleted_by = %admin.user_id, user_id = %id, "User deleted");
    Ok(Json(ApiResponse::message("User deleted successfully")))
}
