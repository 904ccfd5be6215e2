use std::time::Duration;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use baiturrahim_core::AuthError;
use serde::Serialize;

#[derive(Debug)]
pub enum AppError {
    RateLimited { retry_after: Duration },
    Auth(String),
    Forbidden(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

/// Whole seconds, rounded up, never below one.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded. Please try again later.".to_string(),
            ),
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Internal(msg) => {
                // Log the real error server-side, return generic message to client
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = ErrorBody {
            success: false,
            error: message,
        };

        let mut response = (status, axum::Json(body)).into_response();
        if let AppError::RateLimited { retry_after } = self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs(retry_after)),
            );
        }
        response
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::Auth("Invalid credentials".to_string()),
            AuthError::TokenWrongType { .. } => AppError::Auth("Invalid token type".to_string()),
            e if e.is_token_rejection() => {
                tracing::debug!("Token rejected: {e}");
                AppError::Auth("Invalid or expired token".to_string())
            }
            AuthError::UserInactiveOrMissing => {
                AppError::Auth("User not found or inactive".to_string())
            }
            AuthError::UserNotFound => AppError::NotFound("User not found".to_string()),
            AuthError::InsufficientRole => AppError::Forbidden("Insufficient permissions".to_string()),
            AuthError::Conflict(detail) => {
                tracing::debug!("Account conflict: {detail}");
                AppError::Conflict("Username or email already exists".to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<baiturrahim_core::role::UnknownRole> for AppError {
    fn from(e: baiturrahim_core::role::UnknownRole) -> Self {
        AppError::BadRequest(format!("Invalid role filter: {}", e.0))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:#}", e);
        AppError::Internal("Internal server error".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baiturrahim_core::TokenKind;

    fn status_of(e: AuthError) -> StatusCode {
        AppError::from(e).into_response().status()
    }

    #[test]
    fn auth_errors_map_to_expected_statuses() {
        assert_eq!(status_of(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::TokenExpired), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::TokenMalformed), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::TokenBadSignature), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(AuthError::TokenWrongType {
                expected: TokenKind::Access,
                actual: TokenKind::Refresh,
            }),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_of(AuthError::UserInactiveOrMissing), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::InsufficientRole), StatusCode::FORBIDDEN);
        assert_eq!(status_of(AuthError::UserNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(AuthError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_of(AuthError::Store("db down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = AppError::RateLimited {
            retry_after: Duration::from_millis(12_300),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "13");
    }

    #[test]
    fn retry_after_never_reads_zero() {
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
        assert_eq!(retry_after_secs(Duration::from_secs(30)), 30);
    }
}
