use std::sync::Arc;

use baiturrahim_core::{Authenticator, MemoryUserStore, PasswordHasher, RateLimiter, TokenEngine};

use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub auth: Arc<Authenticator>,
    /// Visitor table for the admission layer. Lives for the whole process.
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn from_config(config: ServerConfig) -> anyhow::Result<Self> {
        let loaded_at = chrono::Utc::now();
        let store = MemoryUserStore::with_records(
            config.users.iter().cloned().map(|u| u.into_record(loaded_at)),
        )?;
        tracing::info!("Loaded {} user account(s)", store.len());

        let tokens = TokenEngine::new(
            &config.auth.jwt_secret,
            config.access_ttl(),
            config.refresh_ttl(),
        );
        let auth = Authenticator::new(
            Arc::new(store),
            PasswordHasher::new(config.auth.bcrypt_cost),
            tokens,
        );

        let limiter = RateLimiter::new(config.rate_limit.requests_per_window, config.rate_window())
            .with_idle_windows(config.rate_limit.idle_windows);

        Ok(Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            limiter: Arc::new(limiter),
        })
    }
}
