/// Refresh token model and database operations
///
/// Refresh tokens are long-lived opaque credentials. The wire form is
/// `tgs_{row_id}.{secret}`: the row id selects the stored row and only a
/// salted SHA-256 hash of the secret is persisted, so the table never holds
/// enough to reconstruct a usable token. A token is invalid when:
///
/// - its row's `revoked` flag is set (individual revocation), or
/// - it has passed `expires_at`, or
/// - it was created before `users.sessions_invalidated_at` (bulk
///   revocation, e.g. on password change).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::opaque;

/// Wire-format prefix for refresh tokens
pub const REFRESH_TOKEN_PREFIX: &str = "tgs_";

/// Refresh token row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefreshToken {
    /// Token row ID (embedded in the wire form as the selector)
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Salted SHA-256 hash of the secret part (`salt$hash` hex form)
    #[serde(skip_serializing)]
    pub token_hash: String,

    /// Individual revocation flag
    pub revoked: bool,

    /// Expiry instant
    pub expires_at: DateTime<Utc>,

    /// Issue instant, compared against `sessions_invalidated_at`
    pub created_at: DateTime<Utc>,
}

/// Splits a presented refresh token into (row id, secret)
///
/// Returns None for anything that does not match the wire format; callers
/// treat that as an invalid credential without touching the store.
pub fn parse_refresh_token(presented: &str) -> Option<(Uuid, &str)> {
    let rest = presented.strip_prefix(REFRESH_TOKEN_PREFIX)?;
    let (id_part, secret) = rest.split_once('.')?;
    let id = Uuid::parse_str(id_part).ok()?;
    if secret.is_empty() {
        return None;
    }
    Some((id, secret))
}

impl RefreshToken {
    /// Issues a new refresh token for a user
    ///
    /// Returns the row and the plaintext wire form. The plaintext exists
    /// exactly once, in the response that issued it; hand it to the client
    /// and forget it.
    pub async fn issue(
        pool: &PgPool,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<(Self, String), sqlx::Error> {
        let id = Uuid::new_v4();
        let secret = opaque::generate_token(opaque::REFRESH_SECRET_LENGTH);
        let token_hash = opaque::salted_hash(&secret);
        let expires_at = Utc::now() + ttl;

        let row = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, token_hash, revoked, expires_at, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(pool)
        .await?;

        let plaintext = format!("{}{}.{}", REFRESH_TOKEN_PREFIX, id.simple(), secret);

        Ok((row, plaintext))
    }

    /// Loads the row a presented token selects, if it is still live
    ///
    /// Verifies the salted hash and applies the individual-revocation,
    /// expiry, and bulk-invalidation rules. Returns None in every failure
    /// case; callers never learn which rule rejected the token.
    pub async fn find_valid(
        pool: &PgPool,
        presented: &str,
        sessions_invalidated_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let Some((id, secret)) = parse_refresh_token(presented) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT id, user_id, token_hash, revoked, expires_at, created_at
            FROM refresh_tokens
            WHERE id = $1 AND NOT revoked AND expires_at > NOW()
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        if !opaque::verify_salted_hash(secret, &row.token_hash) {
            return Ok(None);
        }

        if let Some(cutoff) = sessions_invalidated_at {
            if row.created_at < cutoff {
                return Ok(None);
            }
        }

        Ok(Some(row))
    }

    /// Revokes a single token row
    pub async fn revoke(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_refresh_token_round_trip() {
        let id = Uuid::new_v4();
        let wire = format!("{}{}.{}", REFRESH_TOKEN_PREFIX, id.simple(), "s3cret");

        let (parsed_id, secret) = parse_refresh_token(&wire).unwrap();
        assert_eq!(parsed_id, id);
        assert_eq!(secret, "s3cret");
    }

    #[test]
    fn test_parse_refresh_token_rejects_malformed() {
        assert!(parse_refresh_token("").is_none());
        assert!(parse_refresh_token("tgs_").is_none());
        assert!(parse_refresh_token("tgs_notauuid.secret").is_none());
        assert!(parse_refresh_token("wrong_prefix.secret").is_none());

        let id = Uuid::new_v4();
        let missing_secret = format!("{}{}.", REFRESH_TOKEN_PREFIX, id.simple());
        assert!(parse_refresh_token(&missing_secret).is_none());

        let missing_dot = format!("{}{}", REFRESH_TOKEN_PREFIX, id.simple());
        assert!(parse_refresh_token(&missing_dot).is_none());
    }
}
