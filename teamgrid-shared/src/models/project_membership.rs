/// Project membership model and database operations
///
/// Relation (user, project, role) with an activity flag. At most one row per
/// (user, project) pair, enforced by the composite primary key.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_role AS ENUM ('admin', 'member', 'viewer');
///
/// CREATE TABLE project_memberships (
///     project_id UUID NOT NULL REFERENCES projects(id),
///     user_id UUID NOT NULL REFERENCES users(id),
///     role project_role NOT NULL DEFAULT 'member',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Roles within a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    /// Full control over the project and its members
    Admin,

    /// Can create and manage work items
    Member,

    /// Read-only access
    Viewer,
}

impl ProjectRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Admin => "admin",
            ProjectRole::Member => "member",
            ProjectRole::Viewer => "viewer",
        }
    }

    /// Parses a role from its string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(ProjectRole::Admin),
            "member" => Some(ProjectRole::Member),
            "viewer" => Some(ProjectRole::Viewer),
            _ => None,
        }
    }
}

/// Project membership row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMembership {
    /// Project ID
    pub project_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the project
    pub role: ProjectRole,

    /// Activity flag
    pub is_active: bool,

    /// When the membership was created
    pub created_at: DateTime<Utc>,

    /// When the membership was last updated
    pub updated_at: DateTime<Utc>,
}

impl ProjectMembership {
    /// Finds a membership for a (project, user) pair
    pub async fn find(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, ProjectMembership>(
            r#"
            SELECT project_id, user_id, role, is_active, created_at, updated_at
            FROM project_memberships
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Inserts or updates a membership (role change reactivates the row)
    ///
    /// The composite primary key makes this the idempotent "assign" path:
    /// inviting an existing project member simply updates the role. Takes an
    /// executor so it can run inside the accept-invite transaction.
    pub async fn upsert<'e, E: PgExecutor<'e>>(
        executor: E,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Self, sqlx::Error> {
        let membership = sqlx::query_as::<_, ProjectMembership>(
            r#"
            INSERT INTO project_memberships (project_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (project_id, user_id)
            DO UPDATE SET role = EXCLUDED.role, is_active = TRUE, updated_at = NOW()
            RETURNING project_id, user_id, role, is_active, created_at, updated_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(executor)
        .await?;

        Ok(membership)
    }

    /// Lists all members of a project
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let memberships = sqlx::query_as::<_, ProjectMembership>(
            r#"
            SELECT project_id, user_id, role, is_active, created_at, updated_at
            FROM project_memberships
            WHERE project_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(memberships)
    }

    /// Clears the activity flag
    pub async fn deactivate(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE project_memberships
            SET is_active = FALSE, updated_at = NOW()
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_role_parse() {
        assert_eq!(ProjectRole::parse("admin"), Some(ProjectRole::Admin));
        assert_eq!(ProjectRole::parse("member"), Some(ProjectRole::Member));
        assert_eq!(ProjectRole::parse("viewer"), Some(ProjectRole::Viewer));
        assert_eq!(ProjectRole::parse("owner"), None);
    }

    #[test]
    fn test_project_role_round_trip() {
        for role in [ProjectRole::Admin, ProjectRole::Member, ProjectRole::Viewer] {
            assert_eq!(ProjectRole::parse(role.as_str()), Some(role));
        }
    }
}
