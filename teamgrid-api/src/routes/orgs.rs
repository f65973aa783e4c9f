/// Organization and membership endpoints
///
/// # Endpoints
///
/// - `POST   /v1/orgs` - Create an organization (caller becomes OWNER)
/// - `GET    /v1/orgs` - List the caller's organizations
/// - `GET    /v1/org` - Organization details (org-scoped)
/// - `DELETE /v1/org` - Soft-delete the organization (OWNER only)
/// - `GET    /v1/org/members` - List members
/// - `PUT    /v1/org/members/:id` - Change a member's role
/// - `DELETE /v1/org/members/:id` - Deactivate a member
///
/// Everything under `/v1/org` runs behind the full guard chain: the tenant
/// context arrives via the `X-Org-Id` header and the role policy table gates
/// each operation.

use crate::{app::AppState, error::{validation_error, ApiError, ApiResult}};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use teamgrid_shared::auth::policy::{require_operation, Operation};
use teamgrid_shared::guards::{AuthUser, OrgContext};
use teamgrid_shared::models::cascade;
use teamgrid_shared::models::notification::Notification;
use teamgrid_shared::models::org_membership::{OrgMembership, OrgRole, UserOrg};
use teamgrid_shared::models::organization::Organization;
use teamgrid_shared::realtime::LifecycleEvent;
use uuid::Uuid;
use validator::Validate;

/// Create organization request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrgRequest {
    /// Organization display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
}

/// Organization response with the caller's role
#[derive(Debug, Serialize)]
pub struct OrgResponse {
    /// Organization
    #[serde(flatten)]
    pub org: Organization,

    /// Caller's role within it
    pub role: OrgRole,
}

/// Member role update request
#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    /// New organization role
    pub role: OrgRole,
}

/// Creates an organization; the caller becomes its OWNER
pub async fn create_org(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateOrgRequest>,
) -> ApiResult<(StatusCode, Json<OrgResponse>)> {
    req.validate().map_err(validation_error)?;

    let org = Organization::create(&state.db, &req.name).await?;

    OrgMembership::create_active(&state.db, org.id, auth.user_id, &auth.email, OrgRole::Owner)
        .await?;

    tracing::info!(org_id = %org.id, user_id = %auth.user_id, "Organization created");

    Ok((
        StatusCode::CREATED,
        Json(OrgResponse {
            org,
            role: OrgRole::Owner,
        }),
    ))
}

/// Lists the organizations the caller is an active member of
pub async fn list_orgs(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Vec<UserOrg>>> {
    let orgs = UserOrg::list_for_user(&state.db, auth.user_id).await?;
    Ok(Json(orgs))
}

/// Returns the resolved organization's details
pub async fn get_org(
    State(state): State<AppState>,
    Extension(org_ctx): Extension<OrgContext>,
) -> ApiResult<Json<OrgResponse>> {
    require_operation(Operation::ViewOrganization, org_ctx.role)?;

    let org = Organization::find_by_id(&state.db, org_ctx.org_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))?;

    Ok(Json(OrgResponse {
        org,
        role: org_ctx.role,
    }))
}

/// Soft-deletes the organization and cascades to its projects
pub async fn delete_org(
    State(state): State<AppState>,
    Extension(org_ctx): Extension<OrgContext>,
) -> ApiResult<StatusCode> {
    require_operation(Operation::DeleteOrganization, org_ctx.role)?;

    let deleted = cascade::soft_delete_organization(&state.db, org_ctx.org_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Organization not found".to_string()));
    }

    tracing::info!(org_id = %org_ctx.org_id, "Organization soft-deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Lists all memberships of the organization
pub async fn list_members(
    State(state): State<AppState>,
    Extension(org_ctx): Extension<OrgContext>,
) -> ApiResult<Json<Vec<OrgMembership>>> {
    require_operation(Operation::ListMembers, org_ctx.role)?;

    let members = OrgMembership::list_by_org(&state.db, org_ctx.org_id).await?;
    Ok(Json(members))
}

/// Changes a member's organization role
///
/// Role changes touching OWNER (granting it or taking it away) require the
/// requester to be OWNER themselves; ADMIN may only move members between
/// ADMIN and MEMBER.
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(org_ctx): Extension<OrgContext>,
    Path(membership_id): Path<Uuid>,
    Json(req): Json<UpdateMemberRoleRequest>,
) -> ApiResult<Json<OrgMembership>> {
    require_operation(Operation::ManageMembers, org_ctx.role)?;

    let membership = find_in_org(&state, org_ctx.org_id, membership_id).await?;

    let touches_owner = membership.role == OrgRole::Owner || req.role == OrgRole::Owner;
    if touches_owner && org_ctx.role != OrgRole::Owner {
        return Err(ApiError::Forbidden(
            "Only an owner can grant or revoke the owner role".to_string(),
        ));
    }

    let updated = OrgMembership::update_role(&state.db, membership.id, req.role)
        .await?
        .ok_or_else(|| ApiError::NotFound("Membership not found".to_string()))?;

    if let Some(user_id) = updated.user_id {
        let event = LifecycleEvent::RoleUpdated {
            org_id: org_ctx.org_id,
            role: updated.role.as_str().to_string(),
        };
        if let Ok(payload) = serde_json::to_value(&event) {
            if let Err(err) =
                Notification::create(&state.db, user_id, event.kind(), payload).await
            {
                tracing::warn!(%user_id, error = %err, "Failed to persist notification");
            }
        }
        state.registry.publish(user_id, event).await;
    }

    Ok(Json(updated))
}

/// Deactivates a member without erasing their history
pub async fn deactivate_member(
    State(state): State<AppState>,
    Extension(org_ctx): Extension<OrgContext>,
    Path(membership_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_operation(Operation::ManageMembers, org_ctx.role)?;

    let membership = find_in_org(&state, org_ctx.org_id, membership_id).await?;

    if membership.role == OrgRole::Owner && org_ctx.role != OrgRole::Owner {
        return Err(ApiError::Forbidden(
            "Only an owner can deactivate an owner".to_string(),
        ));
    }

    OrgMembership::deactivate(&state.db, membership.id).await?;

    tracing::info!(
        org_id = %org_ctx.org_id,
        membership_id = %membership.id,
        "Member deactivated"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Loads a membership, treating cross-org IDs as absent
async fn find_in_org(
    state: &AppState,
    org_id: Uuid,
    membership_id: Uuid,
) -> ApiResult<OrgMembership> {
    let membership = OrgMembership::find_by_id(&state.db, membership_id)
        .await?
        .filter(|m| m.org_id == org_id)
        .ok_or_else(|| ApiError::NotFound("Membership not found".to_string()))?;

    Ok(membership)
}
