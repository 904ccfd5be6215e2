//! Login, refresh and bearer authentication.
//!
//! Sessions are not stored server-side. A login hands out an access and a
//! refresh token; a refresh swaps a valid refresh token for a new pair as
//! long as the account is still active; logout only acknowledges the
//! request, and both tokens stay valid until they expire.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::{AuthError, AuthResult};
use crate::password::PasswordHasher;
use crate::role::{self, Role};
use crate::store::UserStore;
use crate::token::{TokenEngine, TokenKind, TokenPair};
use crate::user::{CredentialRecord, NewUser, Principal, UserFilter, UserProfile, UserUpdate};

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub tokens: TokenPair,
    pub user: UserProfile,
}

pub struct Authenticator {
    store: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    tokens: TokenEngine,
    clock: Arc<dyn Clock>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn UserStore>, hasher: PasswordHasher, tokens: TokenEngine) -> Self {
        Self {
            store,
            hasher,
            tokens,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Checks an email/password pair against the active account with that
    /// email. Every failure is [`AuthError::InvalidCredentials`].
    ///
    /// Blocks for the duration of a password hash comparison.
    pub fn verify_credentials(&self, email: &str, password: &str) -> AuthResult<CredentialRecord> {
        let record = match self.store.find_active_by_email(email)? {
            Some(record) if record.is_active => record,
            _ => {
                self.hasher.verify_dummy(password);
                tracing::debug!("Login rejected: no active account for the given email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        match self.hasher.verify(&record.password_hash, password) {
            Ok(true) => Ok(record),
            Ok(false) => {
                tracing::debug!(user_id = %record.id, "Login rejected: password mismatch");
                Err(AuthError::InvalidCredentials)
            }
            Err(e) => {
                tracing::error!(user_id = %record.id, "Stored password hash is unusable: {e}");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Verifies credentials, mints a token pair and stamps the login time.
    ///
    /// Failing to persist the login time is logged and otherwise ignored.
    pub fn login(&self, email: &str, password: &str) -> AuthResult<Session> {
        let record = self.verify_credentials(email, password)?;
        let now = self.clock.now();
        let tokens = self.tokens.issue_pair(&record.principal(), now)?;

        let mut user = record.profile();
        let at: DateTime<Utc> = now.into();
        match self.store.record_login(record.id, at) {
            Ok(()) => user.last_login_at = Some(at),
            Err(e) => tracing::warn!(user_id = %record.id, "Failed to record last login: {e}"),
        }

        tracing::info!(user_id = %record.id, role = %record.role, "Login successful");
        Ok(Session { tokens, user })
    }

    /// Validates an access token and returns the caller it names.
    pub fn authenticate(&self, access_token: &str) -> AuthResult<Principal> {
        let claims = self
            .tokens
            .parse_and_validate(access_token, TokenKind::Access, self.clock.now())?;
        Ok(claims.principal())
    }

    /// Exchanges a refresh token for a new pair.
    ///
    /// The account is re-read so the new tokens carry its current email and
    /// role, and a deactivated account cannot refresh.
    pub fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let now = self.clock.now();
        let claims = self
            .tokens
            .parse_and_validate(refresh_token, TokenKind::Refresh, now)?;

        let record = self
            .store
            .find_active_by_id(claims.sub)?
            .ok_or(AuthError::UserInactiveOrMissing)?;

        tracing::debug!(user_id = %record.id, "Refreshing token pair");
        self.tokens.issue_pair(&record.principal(), now)
    }

    /// Acknowledges a logout. Tokens are self-contained, so nothing is
    /// invalidated; the client is expected to drop them.
    pub fn logout(&self, principal: &Principal) {
        tracing::info!(user_id = %principal.user_id, "Logout acknowledged");
    }

    /// Role gate: `Ok` only when the principal holds one of `allowed`.
    pub fn authorize(&self, principal: &Principal, allowed: &[Role]) -> AuthResult<()> {
        if role::authorize(principal, allowed) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %principal.user_id,
                role = %principal.role,
                "Access denied: insufficient role"
            );
            Err(AuthError::InsufficientRole)
        }
    }

    pub fn profile(&self, user_id: Uuid) -> AuthResult<UserProfile> {
        self.store
            .find_by_id(user_id)?
            .map(|r| r.profile())
            .ok_or(AuthError::UserNotFound)
    }

    /// Accounts matching `filter`, newest first.
    pub fn list_users(&self, filter: &UserFilter) -> AuthResult<Vec<UserProfile>> {
        let mut users: Vec<UserProfile> = self
            .store
            .list()?
            .iter()
            .filter(|r| filter.matches(r))
            .map(|r| r.profile())
            .collect();
        users.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(users)
    }

    /// Edits an account. Deactivating it stops future logins and refreshes;
    /// access tokens already issued stay valid until they expire.
    pub fn update_user(&self, user_id: Uuid, update: UserUpdate) -> AuthResult<UserProfile> {
        let mut record = self
            .store
            .find_by_id(user_id)?
            .ok_or(AuthError::UserNotFound)?;

        if record.apply(update, self.clock.now().into()) {
            self.store.update(record.clone())?;
            tracing::info!(
                user_id = %record.id,
                role = %record.role,
                is_active = record.is_active,
                "Account updated"
            );
        }
        Ok(record.profile())
    }

    pub fn delete_user(&self, user_id: Uuid) -> AuthResult<()> {
        if !self.store.delete(user_id)? {
            return Err(AuthError::UserNotFound);
        }
        tracing::info!(user_id = %user_id, "Account deleted");
        Ok(())
    }

    /// Hashes the password and stores a new active account.
    ///
    /// Blocks for the duration of a password hash.
    pub fn create_user(&self, new_user: NewUser) -> AuthResult<UserProfile> {
        let now: DateTime<Utc> = self.clock.now().into();
        let record = CredentialRecord {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: self.hasher.hash(&new_user.password)?,
            full_name: new_user.full_name,
            role: new_user.role,
            avatar_url: new_user.avatar_url,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        let profile = record.profile();
        self.store.create(record)?;
        tracing::info!(user_id = %profile.id, role = %profile.role, "Account created");
        Ok(profile)
    }
}
