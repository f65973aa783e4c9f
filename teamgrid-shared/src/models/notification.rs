/// Persisted notification model
///
/// Realtime delivery through the fan-out registry is best-effort: if a user
/// has no live connection the push is skipped. These rows are the durable
/// fallback, read on the user's next poll.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Persisted notification row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    /// Notification ID
    pub id: Uuid,

    /// Recipient
    pub user_id: Uuid,

    /// Event kind (e.g. "invite_received", "invite_accepted")
    pub kind: String,

    /// Event payload
    pub payload: JsonValue,

    /// When the user marked it read (None = unread)
    pub read_at: Option<DateTime<Utc>>,

    /// When the notification was created
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Persists a notification for a user
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        kind: &str,
        payload: JsonValue,
    ) -> Result<Self, sqlx::Error> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, kind, payload)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, kind, payload, read_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(payload)
        .fetch_one(pool)
        .await?;

        Ok(notification)
    }

    /// Lists a user's notifications, newest first
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, kind, payload, read_at, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(notifications)
    }

    /// Marks a notification read; scoped to the owner so a user can never
    /// touch another user's rows
    pub async fn mark_read(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET read_at = NOW()
            WHERE id = $1 AND user_id = $2 AND read_at IS NULL
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
