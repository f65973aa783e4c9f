/// Explicit cascade soft-delete functions
///
/// Soft-deleting a parent must make its children unreachable in the same
/// operation, preserving the invariant that a deleted organization's
/// projects (and their task lists and tasks) never remain independently
/// reachable. The cascades are explicit functions rather than per-call
/// cleanup so they can be tested in isolation.
///
/// Membership rows are deliberately NOT touched: they stay queryable as
/// history even after the parent is deleted. All reads of content rows
/// filter `deleted_at IS NULL`.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

/// Soft-deletes a project and everything beneath it
///
/// Marks the project, its task lists, and its tasks in one transaction.
/// Returns false if the project does not exist or was already deleted.
pub async fn soft_delete_project(pool: &PgPool, project_id: Uuid) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE projects SET deleted_at = NOW(), updated_at = NOW() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(project_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query(
        "UPDATE task_lists SET deleted_at = NOW() \
         WHERE project_id = $1 AND deleted_at IS NULL",
    )
    .bind(project_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE tasks SET deleted_at = NOW() \
         WHERE project_id = $1 AND deleted_at IS NULL",
    )
    .bind(project_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(%project_id, "Project soft-deleted with cascade");
    Ok(true)
}

/// Soft-deletes an organization and everything beneath it
///
/// Marks the organization, its projects, and their task lists and tasks in
/// one transaction. Returns false if the organization does not exist or was
/// already deleted.
pub async fn soft_delete_organization(pool: &PgPool, org_id: Uuid) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE organizations SET deleted_at = NOW(), updated_at = NOW() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(org_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    sqlx::query(
        "UPDATE tasks SET deleted_at = NOW() \
         WHERE deleted_at IS NULL AND project_id IN \
             (SELECT id FROM projects WHERE org_id = $1)",
    )
    .bind(org_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE task_lists SET deleted_at = NOW() \
         WHERE deleted_at IS NULL AND project_id IN \
             (SELECT id FROM projects WHERE org_id = $1)",
    )
    .bind(org_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE projects SET deleted_at = NOW(), updated_at = NOW() \
         WHERE org_id = $1 AND deleted_at IS NULL",
    )
    .bind(org_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(%org_id, "Organization soft-deleted with cascade");
    Ok(true)
}
