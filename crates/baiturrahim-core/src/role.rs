//! Roles and the authorization gate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::user::Principal;

/// The closed set of roles an account can hold.
///
/// There is no hierarchy: a `SuperAdmin` is not implicitly an `Admin`.
/// Every allowed role must be listed where access is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Editor,
}

/// Roles allowed to manage accounts and other administrative resources.
pub const ADMIN_ROLES: &[Role] = &[Role::SuperAdmin, Role::Admin];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Editor => "editor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Parses the exact wire spelling. Case variants are rejected so that a
    /// role string is either canonical or invalid.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Returns `true` when the principal's role is one of `required`.
///
/// An empty `required` set admits nobody.
pub fn authorize(principal: &Principal, required: &[Role]) -> bool {
    required.contains(&principal.role)
}
