//! Baiturrahim core library: request admission and authentication.
//!
//! `baiturrahim-core` holds the parts of the Baiturrahim API that carry
//! shared state or a multi-step protocol. It knows nothing about HTTP; the
//! `baiturrahim-web` crate wires these types into an axum pipeline.
//!
//! # Modules
//!
//! - [`limiter`]: Fixed-window per-client admission control ([`RateLimiter`]).
//! - [`token`]: Signed access/refresh tokens ([`TokenEngine`], [`Claims`]).
//! - [`password`]: Salted password hashing and verification ([`PasswordHasher`]).
//! - [`role`]: Closed role set and the [`authorize`] gate.
//! - [`user`]: Credential records, principals and public profiles.
//! - [`store`]: The [`UserStore`] lookup contract and an in-memory implementation.
//! - [`authenticator`]: Login, refresh and bearer authentication ([`Authenticator`]).
//! - [`clock`]: Wall-clock abstraction used for token timestamps.
//! - [`error`]: Unified error type ([`AuthError`]) and result alias ([`AuthResult`]).

pub mod authenticator;
pub mod clock;
pub mod error;
pub mod limiter;
pub mod password;
pub mod role;
pub mod store;
pub mod token;
pub mod user;

pub use authenticator::{Authenticator, Session};
pub use clock::{Clock, SystemClock};
pub use error::{AuthError, AuthResult};
pub use limiter::{Admission, RateLimiter};
pub use password::PasswordHasher;
pub use role::{authorize, Role, ADMIN_ROLES};
pub use store::{MemoryUserStore, UserStore};
pub use token::{Claims, TokenEngine, TokenKind, TokenPair};
pub use user::{CredentialRecord, NewUser, Principal, UserFilter, UserProfile, UserUpdate};
