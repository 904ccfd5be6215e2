use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use baiturrahim_core::{CredentialRecord, Role};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Namespace for ids derived from a seed account's email.
const SEED_NAMESPACE: Uuid = Uuid::from_u128(0x6d1c_4a2e_9b7f_4c1a_8e35_b2a7_51f0_c9d4);

/// An account seeded into the user store at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    /// Fixed account id. When absent the id is derived from the email, so
    /// it stays the same across restarts.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    pub password_hash: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Stable id for a seed account without an explicit `id`.
pub fn seed_id(email: &str) -> Uuid {
    Uuid::new_v5(&SEED_NAMESPACE, email.trim().to_ascii_lowercase().as_bytes())
}

impl UserConfig {
    pub fn into_record(self, loaded_at: DateTime<Utc>) -> CredentialRecord {
        let full_name = if self.full_name.is_empty() {
            self.username.clone()
        } else {
            self.full_name
        };
        let created_at = self.created_at.unwrap_or(loaded_at);
        CredentialRecord {
            id: self.id.unwrap_or_else(|| seed_id(&self.email)),
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            full_name,
            role: self.role,
            avatar_url: self.avatar_url,
            is_active: self.is_active,
            last_login_at: None,
            created_at,
            updated_at: created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub tls: TlsConfig,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_access_ttl_minutes")]
    pub access_ttl_minutes: u64,
    #[serde(default = "default_refresh_ttl_days")]
    pub refresh_ttl_days: u64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: u32,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    #[serde(default = "default_idle_windows")]
    pub idle_windows: u32,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
    /// Key clients by the first `X-Forwarded-For` hop. Only safe behind a
    /// proxy that overwrites the header.
    #[serde(default)]
    pub trust_proxy: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsConfig {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_ttl_minutes: default_access_ttl_minutes(),
            refresh_ttl_days: default_refresh_ttl_days(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: default_requests_per_window(),
            window_seconds: default_window_seconds(),
            idle_windows: default_idle_windows(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
            trust_proxy: false,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self { frontend_url: default_frontend_url() }
    }
}

fn default_role() -> Role { Role::Editor }
fn default_true() -> bool { true }
fn default_access_ttl_minutes() -> u64 { 60 }
fn default_refresh_ttl_days() -> u64 { 7 }
fn default_bcrypt_cost() -> u32 { 12 }
fn default_requests_per_window() -> u32 { 100 }
fn default_window_seconds() -> u64 { 60 }
fn default_idle_windows() -> u32 { 5 }
fn default_sweep_interval_seconds() -> u64 { 60 }
fn default_frontend_url() -> String { "http://localhost:3000".to_string() }

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

const WEAK_SECRETS: &[&str] = &[
    "your-secret-key-change-in-production-min-32-characters",
    "change-me",
    "secret",
    "password",
    "jwt-secret",
];

impl ServerConfig {
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.access_ttl_minutes.saturating_mul(60))
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.refresh_ttl_days.saturating_mul(24 * 3600))
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit.window_seconds.max(1))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit.sweep_interval_seconds.max(1))
    }

    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("BAITURRAHIM_CONFIG").map(PathBuf::from).ok();

        let mut config = match config_path {
            Some(path) => {
                let contents = std::fs::read_to_string(&path)?;
                Self::from_toml(&contents)?
            }
            None => Self::from_toml("")?,
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.finalize()?;
        Ok(config)
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(port) = lookup("PORT") {
            self.bind_addr.set_port(port.parse()?);
        }
        if let Some(addr) = lookup("BAITURRAHIM_BIND_ADDR") {
            self.bind_addr = addr.parse()?;
        }
        if let Some(url) = lookup("FRONTEND_URL") {
            self.cors.frontend_url = url;
        }
        if let Some(flag) = lookup("BAITURRAHIM_TRUST_PROXY") {
            self.rate_limit.trust_proxy = matches!(flag.as_str(), "1" | "true" | "yes");
        }
        if let Some(cert) = lookup("BAITURRAHIM_TLS_CERT") {
            self.tls.cert_path = Some(cert);
        }
        if let Some(key) = lookup("BAITURRAHIM_TLS_KEY") {
            self.tls.key_path = Some(key);
        }
        Ok(())
    }

    /// Fills in a missing secret and rejects unusable settings.
    pub fn finalize(&mut self) -> anyhow::Result<()> {
        if self.auth.jwt_secret.is_empty() {
            self.auth.jwt_secret = uuid::Uuid::new_v4().to_string();
            tracing::warn!(
                "No JWT secret configured. Generated random secret (tokens will not survive a restart)."
            );
        }

        if WEAK_SECRETS.iter().any(|&w| self.auth.jwt_secret == w) {
            anyhow::bail!(
                "JWT secret matches a known weak/placeholder value. \
                 Set a strong random secret via the JWT_SECRET environment variable."
            );
        }
        if self.auth.jwt_secret.len() < 32 {
            tracing::warn!(
                "JWT secret is shorter than 32 characters. \
                 Consider using a stronger secret via JWT_SECRET."
            );
        }

        if self.rate_limit.requests_per_window == 0 {
            anyhow::bail!("rate_limit.requests_per_window must be at least 1");
        }
        if self.auth.access_ttl_minutes == 0 || self.auth.refresh_ttl_days == 0 {
            anyhow::bail!("token lifetimes must be greater than zero");
        }
        if self.access_ttl() >= self.refresh_ttl() {
            tracing::warn!("Access tokens live as long as refresh tokens; refresh is pointless.");
        }

        if self.users.is_empty() {
            tracing::warn!("No users configured. Every login will be rejected.");
        }

        Ok(())
    }
}
