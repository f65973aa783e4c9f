/// User model and database operations
///
/// Users are pure identity records: they carry no organization or role
/// information. Tenant context is always derived per request from the
/// membership tables.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT UNIQUE,
///     username VARCHAR(64) UNIQUE,
///     phone VARCHAR(32) UNIQUE,
///     password_hash VARCHAR(255),
///     name VARCHAR(255),
///     token_version INTEGER NOT NULL DEFAULT 0,
///     sessions_invalidated_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ,
///     CHECK (email IS NOT NULL OR username IS NOT NULL OR phone IS NOT NULL)
/// );
/// ```
///
/// Each of email/username/phone is optional, but at least one recovery
/// identifier must be present. `password_hash` is nullable: social-login-only
/// accounts have no password credential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// User model representing an identity record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address (case-insensitive via CITEXT), unique when present
    pub email: Option<String>,

    /// Username, unique when present
    pub username: Option<String>,

    /// Phone number, unique when present
    pub phone: Option<String>,

    /// Argon2id password hash; None for social-login-only accounts
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    /// Optional display name
    pub name: Option<String>,

    /// Monotonic counter embedded in access tokens; bumped on password change
    pub token_version: i32,

    /// All refresh tokens issued before this instant are invalid,
    /// regardless of their individual revoke flag
    pub sessions_invalidated_at: Option<DateTime<Utc>>,

    /// When the user account was created
    pub created_at: DateTime<Utc>,

    /// When the user account was last updated
    pub updated_at: DateTime<Utc>,

    /// When the user last logged in (None if never logged in)
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Email address
    pub email: Option<String>,

    /// Username
    pub username: Option<String>,

    /// Phone number
    pub phone: Option<String>,

    /// Argon2id password hash (NOT a plaintext password); None for
    /// social-login accounts
    pub password_hash: Option<String>,

    /// Optional display name
    pub name: Option<String>,
}

impl CreateUser {
    /// Checks that at least one recovery identifier is present
    ///
    /// Mirrors the database CHECK constraint so callers can fail with a
    /// useful validation error before hitting the store.
    pub fn has_recovery_identifier(&self) -> bool {
        self.email.is_some() || self.username.is_some() || self.phone.is_some()
    }
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A unique constraint is violated (email/username/phone already taken)
    /// - No recovery identifier is present (CHECK constraint)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, username, phone, password_hash, name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, username, phone, password_hash, name,
                      token_version, sessions_invalidated_at,
                      created_at, updated_at, last_login_at
            "#,
        )
        .bind(data.email)
        .bind(data.username)
        .bind(data.phone)
        .bind(data.password_hash)
        .bind(data.name)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, phone, password_hash, name,
                   token_version, sessions_invalidated_at,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, phone, password_hash, name,
                   token_version, sessions_invalidated_at,
                   created_at, updated_at, last_login_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Records a successful login
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET last_login_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replaces the password credential and invalidates all sessions
    ///
    /// Bumps `token_version` and sets `sessions_invalidated_at = NOW()` so
    /// that every outstanding refresh token issued before this moment becomes
    /// invalid, even though its individual revoke flag is unset.
    pub async fn set_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                token_version = token_version + 1,
                sessions_invalidated_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
