mod auth_handlers;
mod users;

use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::rate_limit::admission;
use crate::state::AppState;

pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/refresh", post(auth_handlers::refresh))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(auth_handlers::me))
        .route("/auth/logout", post(auth_handlers::logout))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{id}", put(users::update_user).delete(users::delete_user))
}

/// Full application router. Admission runs before routing, so refused
/// requests never reach a handler or an extractor.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors.frontend_url);

    Router::new()
        .route("/health", get(health))
        .nest(
            "/api/v1",
            auth_router()
                .merge(protected_router())
                .nest("/admin", admin_router()),
        )
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(from_fn_with_state(state.clone(), admission))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": "baiturrahim-api" }))
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ])
        .expose_headers([header::CONTENT_LENGTH, header::RETRY_AFTER])
        .allow_credentials(true)
        .max_age(Duration::from_secs(12 * 3600));

    match HeaderValue::from_str(frontend_url) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!("Invalid frontend URL {frontend_url:?}; cross-origin requests disabled");
            layer
        }
    }
}
