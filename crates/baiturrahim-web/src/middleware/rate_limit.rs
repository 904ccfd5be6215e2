//! Admission layer: every request is counted against its client key
//! before routing. Refused requests never reach a handler.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use baiturrahim_core::Admission;

use crate::error::AppError;
use crate::state::AppState;

pub async fn admission(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());
    let key = client_key(req.headers(), state.config.rate_limit.trust_proxy, peer.as_deref());

    match state.limiter.check(&key) {
        Admission::Allowed { .. } => Ok(next.run(req).await),
        Admission::Limited { retry_after } => {
            tracing::warn!(client = %key, "Rate limit exceeded");
            Err(AppError::RateLimited { retry_after })
        }
    }
}

/// Resolves the key a request is counted under.
///
/// With `trust_proxy` the first `X-Forwarded-For` hop wins; otherwise, or
/// when the header is absent, the TCP peer address is used. Requests with
/// neither share the `"unknown"` bucket.
pub fn client_key(headers: &HeaderMap, trust_proxy: bool, peer: Option<&str>) -> String {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    peer.map_or_else(|| "unknown".to_string(), ToString::to_string)
}
