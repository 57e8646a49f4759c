//! HS256 access and refresh tokens.
//!
//! Both token kinds are signed JWTs carrying [`Claims`]. The `kind` claim keeps
//! a refresh token from being accepted as an access token and vice versa.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult, IdGenerator, config::AuthConfig};

/// Token purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived token sent on every request.
    Access,
    /// Long-lived token exchanged for a new access token.
    Refresh,
}

/// JWT claims embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: String,
    /// Role name at issue time.
    pub role: String,
    /// Token purpose.
    pub kind: TokenKind,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier.
    pub jti: String,
}

/// Access/refresh pair returned on login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    /// Access token.
    pub access: String,
    /// Refresh token.
    pub refresh: String,
}

/// Signs and validates tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    access_token_minutes: i64,
    refresh_token_days: i64,
    id_gen: IdGenerator,
}

impl TokenIssuer {
    /// Create an issuer.
    #[must_use]
    pub const fn new(secret: String, access_token_minutes: i64, refresh_token_days: i64) -> Self {
        Self {
            secret,
            access_token_minutes,
            refresh_token_days,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create an issuer from the auth section of the config.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.jwt_secret.clone(),
            config.access_token_minutes,
            config.refresh_token_days,
        )
    }

    /// Issue a token of the given kind.
    pub fn issue(&self, user_id: &str, role: &str, kind: TokenKind) -> AppResult<String> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => Duration::minutes(self.access_token_minutes),
            TokenKind::Refresh => Duration::days(self.refresh_token_days),
        };

        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            kind,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: self.id_gen.generate_token(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Issue an access/refresh pair.
    pub fn issue_pair(&self, user_id: &str, role: &str) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access: self.issue(user_id, role, TokenKind::Access)?,
            refresh: self.issue(user_id, role, TokenKind::Refresh)?,
        })
    }

    /// Validate signature, expiry and kind.
    pub fn validate(&self, token: &str, expected: TokenKind) -> AppResult<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;

        if data.claims.kind != expected {
            return Err(AppError::Unauthorized);
        }

        Ok(data.claims)
    }

    /// Access token lifetime in seconds.
    #[must_use]
    pub const fn access_ttl_secs(&self) -> i64 {
        self.access_token_minutes * 60
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret-key-for-unit-tests".to_string(), 15, 7)
    }

    #[test]
    fn test_access_token_roundtrip() {
        let issuer = issuer();
        let token = issuer.issue("user1", "owner", TokenKind::Access).unwrap();
        let claims = issuer.validate(&token, TokenKind::Access).unwrap();

        assert_eq!(claims.sub, "user1");
        assert_eq!(claims.role, "owner");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_refresh_token_rejected_as_access() {
        let issuer = issuer();
        let pair = issuer.issue_pair("user1", "staff").unwrap();

        assert!(issuer.validate(&pair.refresh, TokenKind::Access).is_err());
        assert!(issuer.validate(&pair.refresh, TokenKind::Refresh).is_ok());
        assert_ne!(pair.access, pair.refresh);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issuer().issue("user1", "staff", TokenKind::Access).unwrap();
        let other = TokenIssuer::new("another-secret".to_string(), 15, 7);

        assert!(matches!(
            other.validate(&token, TokenKind::Access),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(issuer().validate("not-a-jwt", TokenKind::Access).is_err());
    }
}
