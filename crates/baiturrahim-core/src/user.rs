//! Account shapes: the stored credential record, the per-request principal
//! and the public profile returned to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::Role;

/// A stored account as the user store owns it.
///
/// `password_hash` is never serialized and is redacted from `Debug`.
#[derive(Clone, Serialize)]
pub struct CredentialRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

impl CredentialRecord {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
            avatar_url: self.avatar_url.clone(),
            is_active: self.is_active,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Applies the fields present in `update`. Empty strings leave the
    /// field unchanged. Returns `true` when anything changed.
    pub fn apply(&mut self, update: UserUpdate, at: DateTime<Utc>) -> bool {
        let mut changed = false;

        fn set_text(field: &mut String, value: Option<String>, changed: &mut bool) {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                if *field != value {
                    *field = value;
                    *changed = true;
                }
            }
        }

        set_text(&mut self.username, update.username, &mut changed);
        set_text(&mut self.email, update.email, &mut changed);
        set_text(&mut self.full_name, update.full_name, &mut changed);

        if let Some(role) = update.role.filter(|r| *r != self.role) {
            self.role = role;
            changed = true;
        }
        if let Some(active) = update.is_active.filter(|a| *a != self.is_active) {
            self.is_active = active;
            changed = true;
        }
        if let Some(avatar) = update.avatar_url {
            let avatar = (!avatar.is_empty()).then_some(avatar);
            if avatar != self.avatar_url {
                self.avatar_url = avatar;
                changed = true;
            }
        }

        if changed {
            self.updated_at = at;
        }
        changed
    }
}

/// The authenticated caller, rebuilt from token claims on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account. The password is plaintext here and is
/// hashed before it reaches the store.
#[derive(Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Partial account edit. Absent fields are left alone; an empty
/// `avatar_url` clears the avatar.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub avatar_url: Option<String>,
}

/// Selection applied when listing accounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UserFilter {
    pub fn matches(&self, record: &CredentialRecord) -> bool {
        self.role.map_or(true, |r| r == record.role)
            && self.is_active.map_or(true, |a| a == record.is_active)
    }
}
