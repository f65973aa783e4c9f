/// Organization model and database operations
///
/// Organizations are the tenant boundary: all business data is scoped to
/// exactly one. Deletion is a soft-delete flag, never physical removal,
/// because memberships and audit history must remain queryable.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE organizations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     slug VARCHAR(255) NOT NULL UNIQUE,
///     deleted_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Organization model representing a tenant
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    /// Unique organization ID (UUID v4)
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// URL-safe unique slug, derived from the name
    pub slug: String,

    /// Soft-delete marker; rows are never physically removed
    pub deleted_at: Option<DateTime<Utc>>,

    /// When the organization was created
    pub created_at: DateTime<Utc>,

    /// When the organization was last updated
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// True if the organization has been soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Derives a URL-safe slug from an organization name
///
/// Lowercases, maps runs of non-alphanumeric characters to single hyphens,
/// and trims leading/trailing hyphens.
///
/// # Example
///
/// ```
/// use teamgrid_shared::models::organization::slugify;
///
/// assert_eq!(slugify("Acme Corp"), "acme-corp");
/// assert_eq!(slugify("  Rocket -- Lab!  "), "rocket-lab");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true; // suppress leading hyphen

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}

impl Organization {
    /// Creates a new organization
    ///
    /// The slug is derived from the name; a duplicate slug fails with a
    /// unique constraint violation which callers surface as a conflict.
    ///
    /// # Errors
    ///
    /// Returns an error if the slug already exists or the database
    /// connection fails.
    pub async fn create(pool: &PgPool, name: &str) -> Result<Self, sqlx::Error> {
        let slug = slugify(name);

        let org = sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (name, slug)
            VALUES ($1, $2)
            RETURNING id, name, slug, deleted_at, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(slug)
        .fetch_one(pool)
        .await?;

        Ok(org)
    }

    /// Finds an organization by ID, excluding soft-deleted rows
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let org = sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, name, slug, deleted_at, created_at, updated_at
            FROM organizations
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(org)
    }

    /// Finds an organization by slug, excluding soft-deleted rows
    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Self>, sqlx::Error> {
        let org = sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, name, slug, deleted_at, created_at, updated_at
            FROM organizations
            WHERE slug = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(slug)
        .fetch_optional(pool)
        .await?;

        Ok(org)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Acme Corp"), "acme-corp");
        assert_eq!(slugify("acme"), "acme");
        assert_eq!(slugify("ACME"), "acme");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("Rocket -- Lab"), "rocket-lab");
        assert_eq!(slugify("a   b"), "a-b");
        assert_eq!(slugify("a_b.c"), "a-b-c");
    }

    #[test]
    fn test_slugify_trims_edges() {
        assert_eq!(slugify("  Acme  "), "acme");
        assert_eq!(slugify("!!Acme!!"), "acme");
        assert_eq!(slugify(""), "");
    }
}
