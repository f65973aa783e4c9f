/// Project access resolution
///
/// Given the already-resolved tenant context and a project reference,
/// decides whether the caller may act on that project. Access is granted by
/// either an active explicit project membership or the org-admin override:
/// an organization ADMIN or OWNER may act on any project in their org even
/// without being added as a project member.
///
/// Cross-org access is **strict**: the project's organization must equal
/// the resolved tenant context. A mismatch is Forbidden — the context is
/// never rebound to the project's organization, and the response never
/// reveals that the project exists elsewhere. (A looser rebinding variant
/// exists in the wild to support "switch org automatically when opening a
/// cross-org project"; this implementation deliberately rejects it.)
///
/// This resolver must never be skipped for project-scoped routes.

use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{GuardError, OrgContext, ProjectContext};
use crate::models::project::Project;
use crate::models::project_membership::{ProjectMembership, ProjectRole};

/// Resolves the caller's access to a project
///
/// # Errors
///
/// - `GuardError::NotFound` if the project is absent or soft-deleted
/// - `GuardError::Forbidden` if the project belongs to another organization,
///   or the caller has neither an active project membership nor org
///   ADMIN/OWNER
pub async fn resolve_project_access(
    pool: &PgPool,
    user_id: Uuid,
    org_ctx: OrgContext,
    project_id: Uuid,
) -> Result<ProjectContext, GuardError> {
    let project = Project::find_by_id(pool, project_id)
        .await?
        .ok_or(GuardError::NotFound)?;

    // Strict tenant isolation: the project must live in the resolved org.
    if project.org_id != org_ctx.org_id {
        return Err(GuardError::Forbidden);
    }

    if let Some(membership) = ProjectMembership::find(pool, project.id, user_id).await? {
        if membership.is_active {
            debug!(
                %user_id, %project_id, role = membership.role.as_str(),
                "Project access via explicit membership"
            );
            return Ok(ProjectContext {
                project_id: project.id,
                org_id: project.org_id,
                project_role: membership.role,
            });
        }
    }

    // Org-admin override: ADMIN/OWNER in the project's organization act as
    // project admins without an explicit membership row.
    if org_ctx.role.is_admin() {
        debug!(%user_id, %project_id, "Project access via org-admin override");
        return Ok(ProjectContext {
            project_id: project.id,
            org_id: project.org_id,
            project_role: ProjectRole::Admin,
        });
    }

    Err(GuardError::Forbidden)
}
