use baiturrahim_core::{Role, Session, TokenPair, UserProfile};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Success envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: (!message.is_empty()).then(|| message.to_string()),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.to_string()),
        }
    }
}

/// Envelope for a page of results.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl<T> PaginatedResponse<T> {
    /// Cuts `page` out of `items`.
    pub fn paginate(items: Vec<T>, page: Page) -> Self {
        let total = items.len();
        let data = items
            .into_iter()
            .skip(page.page.saturating_sub(1).saturating_mul(page.limit))
            .take(page.limit)
            .collect();
        Self {
            success: true,
            data,
            page: page.page,
            limit: page.limit,
            total,
            total_pages: total.div_ceil(page.limit.max(1)),
        }
    }
}

pub const DEFAULT_PAGE_LIMIT: usize = 10;
pub const MAX_PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: usize,
    pub limit: usize,
}

impl Page {
    /// Parses `page`/`limit` query values. Missing, non-numeric or
    /// out-of-range values fall back to page 1 and a limit of 10.
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = page
            .and_then(|p| p.parse::<usize>().ok())
            .filter(|&p| p > 0)
            .unwrap_or(1);
        let limit = limit
            .and_then(|l| l.parse::<usize>().ok())
            .filter(|l| (1..=MAX_PAGE_LIMIT).contains(l))
            .unwrap_or(DEFAULT_PAGE_LIMIT);
        Self { page, limit }
    }
}

/// Query string accepted by the user list.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<String>,
    pub is_active: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub avatar_url: Option<String>,
}

impl From<UserProfile> for PublicProfile {
    fn from(p: UserProfile) -> Self {
        Self {
            id: p.id,
            email: p.email,
            username: p.username,
            full_name: p.full_name,
            role: p.role,
            avatar_url: p.avatar_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user: PublicProfile,
}

impl From<Session> for LoginResponse {
    fn from(session: Session) -> Self {
        Self {
            access_token: session.tokens.access_token,
            refresh_token: session.tokens.refresh_token,
            expires_in: session.tokens.expires_in,
            user: session.user.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: pair.expires_in,
        }
    }
}
