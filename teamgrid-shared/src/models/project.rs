/// Project model and database operations
///
/// A project belongs to exactly one organization and has a user as owner.
/// Soft-deletable; all reads filter out deleted rows so a deleted project is
/// never independently reachable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Project model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Unique project ID (UUID v4)
    pub id: Uuid,

    /// Owning organization
    pub org_id: Uuid,

    /// User who owns the project
    pub owner_id: Uuid,

    /// Display name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Soft-delete marker
    pub deleted_at: Option<DateTime<Utc>>,

    /// When the project was created
    pub created_at: DateTime<Utc>,

    /// When the project was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    /// Owning organization
    pub org_id: Uuid,

    /// User who owns the project
    pub owner_id: Uuid,

    /// Display name
    pub name: String,

    /// Optional description
    pub description: Option<String>,
}

impl Project {
    /// Creates a new project
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (org_id, owner_id, name, description)
            VALUES ($1, $2, $3, $4)
            RETURNING id, org_id, owner_id, name, description,
                      deleted_at, created_at, updated_at
            "#,
        )
        .bind(data.org_id)
        .bind(data.owner_id)
        .bind(data.name)
        .bind(data.description)
        .fetch_one(pool)
        .await?;

        Ok(project)
    }

    /// Finds a project by ID, excluding soft-deleted rows
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, org_id, owner_id, name, description,
                   deleted_at, created_at, updated_at
            FROM projects
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Lists the live projects of an organization
    pub async fn list_by_org(pool: &PgPool, org_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, org_id, owner_id, name, description,
                   deleted_at, created_at, updated_at
            FROM projects
            WHERE org_id = $1 AND deleted_at IS NULL
            ORDER BY created_at ASC
            "#,
        )
        .bind(org_id)
        .fetch_all(pool)
        .await?;

        Ok(projects)
    }
}
