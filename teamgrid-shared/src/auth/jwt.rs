/// Access token generation and validation
///
/// Access tokens are short-lived JWTs signed with HS256. They encode
/// **identity only** — user id, email, token version — and never an
/// organization or role. Tenant context is re-derived on every request from
/// the `X-Org-Id` header, which is what lets one session operate against
/// multiple organizations without minting a new token per switch, and keeps
/// a cached token harmless if the user's memberships change.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: 15 minutes by default (configurable)
/// - **Validation**: signature, expiration, and issuer checks
/// - Secrets should be at least 32 bytes
///
/// # Example
///
/// ```
/// use teamgrid_shared::auth::jwt::{create_token, validate_access_token, Claims};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let claims = Claims::new(Uuid::new_v4(), "user@example.com", 0, Duration::minutes(15));
/// let token = create_token(&claims, "your-secret-key")?;
///
/// let validated = validate_access_token(&token, "your-secret-key")?;
/// assert_eq!(validated.sub, claims.sub);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token issuer claim value
const ISSUER: &str = "teamgrid";

/// Token type claim value for access tokens
const ACCESS_TOKEN_TYPE: &str = "access";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid issuer")]
    InvalidIssuer,

    /// Token is not an access token
    #[error("Invalid token type")]
    InvalidTokenType,
}

/// Access token claims
///
/// Standard claims plus the identity fields. Deliberately has no tenant or
/// role claim; see module docs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: Uuid,

    /// User email at issue time
    pub email: String,

    /// User's token version at issue time; bumped on password change
    pub token_version: i32,

    /// Issuer - always "teamgrid"
    pub iss: String,

    /// Token type - always "access"; guards against another signed artifact
    /// being replayed as an access token
    pub token_type: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl Claims {
    /// Creates new access token claims
    pub fn new(user_id: Uuid, email: &str, token_version: i32, ttl: Duration) -> Self {
        let now = Utc::now();
        let expiration = now + ttl;

        Self {
            sub: user_id,
            email: email.to_string(),
            token_version,
            iss: ISSUER.to_string(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
        }
    }

    /// Checks if the token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Creates a signed access token from claims
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails (e.g. malformed secret)
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key).map_err(|e| JwtError::CreateError(e.to_string()))
}

/// Validates an access token and returns its claims
///
/// Pure validation: no store access, no side effects. Callers attach the
/// result to request-scoped context.
///
/// # Errors
///
/// - `JwtError::Expired` when past `exp`
/// - `JwtError::InvalidIssuer` when `iss` is not "teamgrid"
/// - `JwtError::InvalidTokenType` when `token_type` is not "access"
/// - `JwtError::ValidationError` for a bad signature or malformed token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_nbf = true;

    let data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(e.to_string()),
    })?;

    if data.claims.token_type != ACCESS_TOKEN_TYPE {
        return Err(JwtError::InvalidTokenType);
    }

    Ok(data.claims)
}
