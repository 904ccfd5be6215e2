//! Signed access and refresh tokens.
//!
//! Tokens are HS256 JWTs. Expiry is checked here rather than by
//! `jsonwebtoken` so the boundary is exact: a token is valid while
//! `now < exp` and expired from the `exp` instant onward, with no leeway.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::role::Role;
use crate::user::Principal;

/// Default access token lifetime.
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(60 * 60);

/// Default refresh token lifetime.
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub token_type: TokenKind,
    pub iat: u64,
    pub exp: u64,
    pub jti: Uuid,
}

impl Claims {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.sub,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// An access token and its companion refresh token.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Mints and validates tokens with a fixed server secret.
pub struct TokenEngine {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenEngine {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    pub fn issue(&self, principal: &Principal, kind: TokenKind, now: SystemTime) -> AuthResult<String> {
        let iat = now
            .duration_since(UNIX_EPOCH)
            .map_err(|_| AuthError::Signing("clock is before the Unix epoch".to_string()))?
            .as_secs();

        let claims = Claims {
            sub: principal.user_id,
            email: principal.email.clone(),
            role: principal.role,
            token_type: kind,
            iat,
            exp: iat.saturating_add(self.ttl(kind).as_secs()),
            jti: Uuid::new_v4(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    pub fn issue_access_token(&self, principal: &Principal, now: SystemTime) -> AuthResult<String> {
        self.issue(principal, TokenKind::Access, now)
    }

    pub fn issue_refresh_token(&self, principal: &Principal, now: SystemTime) -> AuthResult<String> {
        self.issue(principal, TokenKind::Refresh, now)
    }

    pub fn issue_pair(&self, principal: &Principal, now: SystemTime) -> AuthResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access_token(principal, now)?,
            refresh_token: self.issue_refresh_token(principal, now)?,
            expires_in: self.access_ttl.as_secs(),
        })
    }

    /// Checks signature, then expiry, then token type.
    pub fn parse_and_validate(
        &self,
        token: &str,
        expected: TokenKind,
        now: SystemTime,
    ) -> AuthResult<Claims> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::TokenBadSignature,
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenMalformed,
            })?
            .claims;

        let now = now.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        if now >= Duration::from_secs(claims.exp) {
            return Err(AuthError::TokenExpired);
        }

        if claims.token_type != expected {
            return Err(AuthError::TokenWrongType {
                expected,
                actual: claims.token_type,
            });
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "masjid-baiturrahim-test-secret-0123456789";

    fn engine() -> TokenEngine {
        TokenEngine::new(SECRET, DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL)
    }

    fn t0() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            email: "takmir@baiturrahim.test".to_string(),
            role,
        }
    }

    #[test]
    fn access_token_round_trips_identity() {
        let engine = engine();
        for role in [Role::SuperAdmin, Role::Admin, Role::Editor] {
            for email in ["a@b.c", "sekretariat+info@baiturrahim.test", "ümmet@例え.jp"] {
                let p = Principal {
                    user_id: Uuid::new_v4(),
                    email: email.to_string(),
                    role,
                };
                let token = engine.issue_access_token(&p, t0()).unwrap();
                let claims = engine
                    .parse_and_validate(&token, TokenKind::Access, t0())
                    .unwrap();
                assert_eq!(claims.principal(), p);
                assert_eq!(claims.token_type, TokenKind::Access);
                assert_eq!(claims.iat, 1_700_000_000);
                assert_eq!(claims.exp, 1_700_000_000 + 3600);
            }
        }
    }

    #[test]
    fn refresh_token_rejected_where_access_expected() {
        let engine = engine();
        let token = engine.issue_refresh_token(&principal(Role::Admin), t0()).unwrap();
        let err = engine
            .parse_and_validate(&token, TokenKind::Access, t0())
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::TokenWrongType {
                expected: TokenKind::Access,
                actual: TokenKind::Refresh
            }
        ));
    }

    #[test]
    fn access_token_rejected_where_refresh_expected() {
        let engine = engine();
        let token = engine.issue_access_token(&principal(Role::Editor), t0()).unwrap();
        let err = engine
            .parse_and_validate(&token, TokenKind::Refresh, t0())
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenWrongType { .. }));
    }

    #[test]
    fn expiry_is_exclusive() {
        let engine = engine();
        let token = engine.issue_access_token(&principal(Role::Admin), t0()).unwrap();
        let exp = t0() + DEFAULT_ACCESS_TTL;

        let just_before = exp - Duration::from_micros(1);
        assert!(engine
            .parse_and_validate(&token, TokenKind::Access, just_before)
            .is_ok());

        assert!(matches!(
            engine.parse_and_validate(&token, TokenKind::Access, exp),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn expired_wins_over_wrong_type() {
        let engine = engine();
        let token = engine.issue_refresh_token(&principal(Role::Admin), t0()).unwrap();
        let later = t0() + DEFAULT_REFRESH_TTL;
        assert!(matches!(
            engine.parse_and_validate(&token, TokenKind::Access, later),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn refresh_token_outlives_access_token() {
        let engine = engine();
        let pair = engine.issue_pair(&principal(Role::Editor), t0()).unwrap();
        let two_hours = t0() + Duration::from_secs(2 * 3600);
        assert!(matches!(
            engine.parse_and_validate(&pair.access_token, TokenKind::Access, two_hours),
            Err(AuthError::TokenExpired)
        ));
        assert!(engine
            .parse_and_validate(&pair.refresh_token, TokenKind::Refresh, two_hours)
            .is_ok());
        assert_eq!(pair.expires_in, 3600);
    }

    #[test]
    fn foreign_secret_is_bad_signature() {
        let other = TokenEngine::new("another-secret-another-secret-xx", DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL);
        let token = other.issue_access_token(&principal(Role::Admin), t0()).unwrap();
        assert!(matches!(
            engine().parse_and_validate(&token, TokenKind::Access, t0()),
            Err(AuthError::TokenBadSignature)
        ));
    }

    #[test]
    fn swapped_payload_breaks_signature() {
        let engine = engine();
        let editor = engine.issue_access_token(&principal(Role::Editor), t0()).unwrap();
        let admin = engine.issue_access_token(&principal(Role::SuperAdmin), t0()).unwrap();

        let editor_parts: Vec<&str> = editor.split('.').collect();
        let admin_parts: Vec<&str> = admin.split('.').collect();
        let forged = format!("{}.{}.{}", editor_parts[0], admin_parts[1], editor_parts[2]);

        assert!(matches!(
            engine.parse_and_validate(&forged, TokenKind::Access, t0()),
            Err(AuthError::TokenBadSignature)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let engine = engine();
        for raw in ["", "abc", "a.b.c", "Bearer x.y.z"] {
            assert!(matches!(
                engine.parse_and_validate(raw, TokenKind::Access, t0()),
                Err(AuthError::TokenMalformed)
            ));
        }
    }

    #[test]
    fn signed_token_with_unknown_role_is_malformed() {
        let claims = serde_json::json!({
            "sub": Uuid::new_v4(),
            "email": "x@y.z",
            "role": "imam",
            "token_type": "access",
            "iat": 1_700_000_000u64,
            "exp": 1_800_000_000u64,
            "jti": Uuid::new_v4(),
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(matches!(
            engine().parse_and_validate(&token, TokenKind::Access, t0()),
            Err(AuthError::TokenMalformed)
        ));
    }

    #[test]
    fn tokens_minted_in_the_same_second_differ() {
        let engine = engine();
        let p = principal(Role::Admin);
        assert_ne!(
            engine.issue_access_token(&p, t0()).unwrap(),
            engine.issue_access_token(&p, t0()).unwrap()
        );
    }
}
