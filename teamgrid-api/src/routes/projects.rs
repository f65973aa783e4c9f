/// Project and project membership endpoints
///
/// # Endpoints
///
/// - `POST   /v1/projects` - Create a project (ADMIN/OWNER)
/// - `GET    /v1/projects` - List the organization's projects
/// - `GET    /v1/projects/:id` - Project details
/// - `DELETE /v1/projects/:id` - Soft-delete a project
/// - `GET    /v1/projects/:id/members` - List project members
/// - `PUT    /v1/projects/:id/members/:user_id` - Add or update a member
///
/// All routes run behind the full guard chain; the per-project routes
/// additionally resolve project access, which enforces strict tenant
/// isolation (a project in another organization is Forbidden, never
/// silently rebound) and the org-admin override.

use crate::{app::AppState, error::{validation_error, ApiError, ApiResult}};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use teamgrid_shared::auth::policy::{require_operation, Operation};
use teamgrid_shared::guards::project_access::resolve_project_access;
use teamgrid_shared::guards::{AuthUser, OrgContext};
use teamgrid_shared::models::cascade;
use teamgrid_shared::models::org_membership::OrgMembership;
use teamgrid_shared::models::project::{CreateProject, Project};
use teamgrid_shared::models::project_membership::{ProjectMembership, ProjectRole};
use uuid::Uuid;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    /// Project name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Optional description
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
}

/// Project response with the caller's effective role
#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    /// Project
    #[serde(flatten)]
    pub project: Project,

    /// Caller's effective project role
    pub project_role: ProjectRole,
}

/// Project member upsert request
#[derive(Debug, Deserialize)]
pub struct UpsertMemberRequest {
    /// Project role to grant
    pub role: ProjectRole,
}

/// Creates a project; the creator becomes its project admin
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(org_ctx): Extension<OrgContext>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<ProjectResponse>)> {
    req.validate().map_err(validation_error)?;
    require_operation(Operation::CreateProject, org_ctx.role)?;

    let project = Project::create(
        &state.db,
        CreateProject {
            org_id: org_ctx.org_id,
            owner_id: auth.user_id,
            name: req.name,
            description: req.description,
        },
    )
    .await?;

    ProjectMembership::upsert(&state.db, project.id, auth.user_id, ProjectRole::Admin).await?;

    tracing::info!(org_id = %org_ctx.org_id, project_id = %project.id, "Project created");

    Ok((
        StatusCode::CREATED,
        Json(ProjectResponse {
            project,
            project_role: ProjectRole::Admin,
        }),
    ))
}

/// Lists the organization's live projects
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(org_ctx): Extension<OrgContext>,
) -> ApiResult<Json<Vec<Project>>> {
    require_operation(Operation::ListProjects, org_ctx.role)?;

    let projects = Project::list_by_org(&state.db, org_ctx.org_id).await?;
    Ok(Json(projects))
}

/// Returns a project the caller may access
pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(org_ctx): Extension<OrgContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<ProjectResponse>> {
    let access = resolve_project_access(&state.db, auth.user_id, org_ctx, project_id).await?;

    let project = Project::find_by_id(&state.db, access.project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(Json(ProjectResponse {
        project,
        project_role: access.project_role,
    }))
}

/// Soft-deletes a project and cascades to its task lists and tasks
///
/// Requires project admin, which the org-admin override also satisfies.
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(org_ctx): Extension<OrgContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let access = resolve_project_access(&state.db, auth.user_id, org_ctx, project_id).await?;

    if access.project_role != ProjectRole::Admin {
        return Err(ApiError::Forbidden(
            "Project admin role required".to_string(),
        ));
    }

    let deleted = cascade::soft_delete_project(&state.db, access.project_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    tracing::info!(project_id = %access.project_id, "Project soft-deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Lists a project's memberships
pub async fn list_project_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(org_ctx): Extension<OrgContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ProjectMembership>>> {
    let access = resolve_project_access(&state.db, auth.user_id, org_ctx, project_id).await?;

    let members = ProjectMembership::list_by_project(&state.db, access.project_id).await?;
    Ok(Json(members))
}

/// Adds a member to a project or updates their role
///
/// The target must already be an active member of the organization; project
/// membership never reaches across tenant boundaries.
pub async fn upsert_project_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Extension(org_ctx): Extension<OrgContext>,
    Path((project_id, target_user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpsertMemberRequest>,
) -> ApiResult<Json<ProjectMembership>> {
    let access = resolve_project_access(&state.db, auth.user_id, org_ctx, project_id).await?;

    if access.project_role != ProjectRole::Admin {
        return Err(ApiError::Forbidden(
            "Project admin role required".to_string(),
        ));
    }

    let target_is_member =
        OrgMembership::resolve_active_role(&state.db, org_ctx.org_id, target_user_id)
            .await?
            .is_some();

    if !target_is_member {
        return Err(ApiError::BadRequest(
            "Target user is not an active member of this organization".to_string(),
        ));
    }

    let membership =
        ProjectMembership::upsert(&state.db, access.project_id, target_user_id, req.role).await?;

    Ok(Json(membership))
}
