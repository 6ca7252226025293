//! JWT token generation and validation.
//!
//! Dual-token system with disjoint signing secrets: a refresh-signed token can
//! never pass access verification (and vice versa) because the two classes
//! share no key material, not just a type claim.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Access token duration: 15 minutes
pub const ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;

/// Refresh token duration: 7 days
pub const REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// JWT claims carried by both token classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account UUID)
    pub sub: String,
    /// Account email
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Keys and expiries for both token classes, fixed at process start.
#[derive(Clone)]
pub struct JwtConfig {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

/// A signed token together with its lifetime.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Token duration in seconds
    pub duration: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
}

/// Access and refresh tokens issued together with identical claims.
/// Ephemeral: the refresh half is persisted on the account, never the pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

impl JwtConfig {
    /// Create a JWT configuration with separate access and refresh secrets.
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl_secs: u64,
        refresh_ttl_secs: u64,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    fn issue(
        &self,
        sub: &str,
        email: &str,
        key: &EncodingKey,
        ttl_secs: u64,
    ) -> Result<IssuedToken, JwtError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| JwtError::TimeError)?
            .as_secs();

        let exp = now + ttl_secs;

        let claims = Claims {
            sub: sub.to_string(),
            email: email.to_string(),
            iat: now,
            exp,
        };

        let token =
            jsonwebtoken::encode(&Header::default(), &claims, key).map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            duration: ttl_secs,
            expires_at: exp,
        })
    }

    /// Issue a short-lived access token. Stateless, validity is signature + expiry.
    pub fn issue_access(&self, sub: &str, email: &str) -> Result<IssuedToken, JwtError> {
        self.issue(sub, email, &self.access_encoding, self.access_ttl_secs)
    }

    /// Issue a long-lived refresh token. The caller persists it on the account
    /// so the stored value can revoke it before expiry.
    pub fn issue_refresh(&self, sub: &str, email: &str) -> Result<IssuedToken, JwtError> {
        self.issue(sub, email, &self.refresh_encoding, self.refresh_ttl_secs)
    }

    /// Issue an access/refresh pair with identical claims.
    pub fn issue_pair(&self, sub: &str, email: &str) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access: self.issue_access(sub, email)?,
            refresh: self.issue_refresh(sub, email)?,
        })
    }

    fn verify(&self, token: &str, key: &DecodingKey) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data = jsonwebtoken::decode::<Claims>(token, key, &validation).map_err(|e| {
            if matches!(
                e.kind(),
                jsonwebtoken::errors::ErrorKind::ExpiredSignature
            ) {
                JwtError::Expired
            } else {
                JwtError::Invalid(e)
            }
        })?;

        Ok(token_data.claims)
    }

    /// Validate and decode an access token.
    pub fn verify_access(&self, token: &str) -> Result<Claims, JwtError> {
        self.verify(token, &self.access_decoding)
    }

    /// Validate and decode a refresh token.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, JwtError> {
        self.verify(token, &self.refresh_decoding)
    }

    /// Refresh token lifetime, used for the cookie Max-Age.
    pub fn refresh_ttl_secs(&self) -> u64 {
        self.refresh_ttl_secs
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Token is past its expiry
    Expired,
    /// Malformed token or bad signature
    Invalid(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Expired => write!(f, "Token has expired"),
            JwtError::Invalid(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig::new(
            b"test-access-secret-for-testing",
            b"test-refresh-secret-for-testing",
            ACCESS_TOKEN_TTL_SECS,
            REFRESH_TOKEN_TTL_SECS,
        )
    }

    #[test]
    fn test_issue_and_verify_access_token() {
        let config = test_config();

        let issued = config
            .issue_access("uuid-123", "alice@example.com")
            .unwrap();
        assert_eq!(issued.duration, ACCESS_TOKEN_TTL_SECS);

        let claims = config.verify_access(&issued.token).unwrap();
        assert_eq!(claims.sub, "uuid-123");
        assert_eq!(claims.email, "alice@example.com");
        assert_eq!(claims.exp, claims.iat + ACCESS_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_issue_and_verify_refresh_token() {
        let config = test_config();

        let issued = config
            .issue_refresh("uuid-123", "alice@example.com")
            .unwrap();
        assert_eq!(issued.duration, REFRESH_TOKEN_TTL_SECS);

        let claims = config.verify_refresh(&issued.token).unwrap();
        assert_eq!(claims.sub, "uuid-123");
        assert_eq!(claims.exp, issued.expires_at);
    }

    #[test]
    fn test_token_classes_not_interchangeable() {
        let config = test_config();

        let access = config
            .issue_access("uuid-123", "alice@example.com")
            .unwrap();
        let refresh = config
            .issue_refresh("uuid-123", "alice@example.com")
            .unwrap();

        // Disjoint secrets: each class fails the other's verification
        assert!(config.verify_refresh(&access.token).is_err());
        assert!(config.verify_access(&refresh.token).is_err());
    }

    #[test]
    fn test_issue_pair_identical_claims() {
        let config = test_config();

        let pair = config.issue_pair("uuid-123", "alice@example.com").unwrap();
        let access_claims = config.verify_access(&pair.access.token).unwrap();
        let refresh_claims = config.verify_refresh(&pair.refresh.token).unwrap();

        assert_eq!(access_claims.sub, refresh_claims.sub);
        assert_eq!(access_claims.email, refresh_claims.email);
    }

    #[test]
    fn test_invalid_token() {
        let config = test_config();

        let result = config.verify_access("not-a-token");
        assert!(matches!(result, Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = test_config();
        let config2 = JwtConfig::new(
            b"another-access-secret",
            b"another-refresh-secret",
            ACCESS_TOKEN_TTL_SECS,
            REFRESH_TOKEN_TTL_SECS,
        );

        let issued = config1
            .issue_access("uuid-123", "alice@example.com")
            .unwrap();
        assert!(matches!(
            config2.verify_access(&issued.token),
            Err(JwtError::Invalid(_))
        ));
    }

    #[test]
    fn test_expired_token_distinguished_from_invalid() {
        let secret = b"test-access-secret-for-testing";
        let encoding_key = EncodingKey::from_secret(secret);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        // Claims with exp in the past
        let claims = Claims {
            sub: "uuid-123".to_string(),
            email: "alice@example.com".to_string(),
            iat: now - 100,
            exp: now - 50,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &encoding_key).unwrap();

        let config = test_config();
        assert!(matches!(
            config.verify_access(&token),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn test_configured_ttls() {
        let config = JwtConfig::new(b"access-secret", b"refresh-secret", 60, 120);

        let pair = config.issue_pair("uuid-123", "alice@example.com").unwrap();
        assert_eq!(pair.access.duration, 60);
        assert_eq!(pair.refresh.duration, 120);
    }
}
