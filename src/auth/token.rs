// JWT token generation and validation service

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{
    error::TokenError,
    models::{Role, User},
};
use crate::config::AuthConfig;

/// JWT claims structure, shared by access and refresh tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // user_id
    pub email: String,
    pub role: Role,
    pub iat: i64, // issued at timestamp
    pub exp: i64, // expiration timestamp
    pub jti: Uuid, // unique per token
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// A freshly issued access + refresh pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// One class of token: its own key pair and lifetime
#[derive(Clone)]
struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// Token service for JWT operations
///
/// Access and refresh tokens are signed with distinct secrets, so a token of
/// one class never verifies as the other.
#[derive(Clone)]
pub struct TokenService {
    access: TokenKeys,
    refresh: TokenKeys,
    validation: Validation,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access.ttl)
            .field("refresh_ttl", &self.refresh.ttl)
            .finish()
    }
}

impl TokenService {
    /// Create a new TokenService from auth configuration
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            access: TokenKeys::new(&config.access_secret, config.access_ttl),
            refresh: TokenKeys::new(&config.refresh_secret, config.refresh_ttl),
            validation,
        }
    }

    /// Generate an access token for the user
    pub fn sign_access(&self, user: &User) -> Result<String, TokenError> {
        Self::sign(&self.access, user, Utc::now()).map(|(token, _)| token)
    }

    /// Generate a refresh token for the user, returning its expiry alongside
    pub fn sign_refresh(&self, user: &User) -> Result<(String, DateTime<Utc>), TokenError> {
        Self::sign(&self.refresh, user, Utc::now())
    }

    /// Generate both access and refresh tokens
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, TokenError> {
        let access_token = self.sign_access(user)?;
        let (refresh_token, refresh_expires_at) = self.sign_refresh(user)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            refresh_expires_at,
        })
    }

    /// Validate an access token (signature and expiry)
    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(&self.access, token)
    }

    /// Validate a refresh token (signature and expiry)
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(&self.refresh, token)
    }

    /// Read claims without checking signature or expiry
    ///
    /// Only for locating the session record to drop at logout. Never use the
    /// result to authorize anything.
    pub fn decode_unverified(token: &str) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .ok()
    }

    /// Parse an Authorization header value of the form "Bearer <token>"
    pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
        let token = header?.strip_prefix("Bearer ")?.trim();
        if token.is_empty() || token.contains(char::is_whitespace) {
            None
        } else {
            Some(token)
        }
    }

    fn sign(
        keys: &TokenKeys,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), TokenError> {
        let expires_at = now + keys.ttl;
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok((token, claims.expires_at()))
    }

    fn verify(&self, keys: &TokenKeys, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &keys.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::InvalidSignature,
            })
    }
}
