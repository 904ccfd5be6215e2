mod api;
mod auth;
mod config;
mod dto;
mod error;
mod middleware;
mod state;

use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "baiturrahim_web=debug,baiturrahim_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load()?;
    let bind_addr = config.bind_addr;
    let tls_config = config.tls.clone();
    let sweep_interval = config.sweep_interval();

    let state = AppState::from_config(config)?;
    tracing::info!(
        budget = state.limiter.budget(),
        window_secs = state.limiter.window().as_secs(),
        "Admission control enabled"
    );

    // Visitor table cleanup task
    let limiter = state.limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            let removed = limiter.sweep();
            if removed > 0 {
                tracing::debug!(removed, tracked = limiter.tracked(), "Swept idle visitors");
            }
        }
    });

    let app = api::router(state);

    if let (Some(cert), Some(key)) = (&tls_config.cert_path, &tls_config.key_path) {
        use axum_server::tls_rustls::RustlsConfig;
        let rustls_config = RustlsConfig::from_pem_file(cert, key).await?;
        tracing::info!("baiturrahim-web listening on https://{}", bind_addr);
        axum_server::bind_rustls(bind_addr, rustls_config)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        tracing::info!("baiturrahim-web listening on http://{}", bind_addr);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
    }

    Ok(())
}
