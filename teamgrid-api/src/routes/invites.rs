/// Invitation lifecycle endpoints
///
/// # Endpoints
///
/// - `POST /v1/org/invites` - Send an invitation (ADMIN/OWNER, org-scoped)
/// - `GET  /v1/org/invites` - List pending invitations (org-scoped)
/// - `POST /v1/org/invites/:id/resend` - Reissue an invitation token
/// - `POST /v1/invites/accept` - Accept an invitation (token in body)
/// - `POST /v1/invites/reject` - Reject an invitation (token in body)
///
/// Accept and reject are deliberately outside the org-scoped tree: the
/// invitee is not a member yet, so there is no tenant context to resolve.
/// The token itself is the capability.

use crate::{app::AppState, error::{validation_error, ApiResult}};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use teamgrid_shared::auth::policy::{require_operation, Operation};
use teamgrid_shared::guards::{AuthUser, OrgContext};
use teamgrid_shared::invites::{InviteOutcome, SendInvite};
use teamgrid_shared::models::org_membership::{OrgMembership, OrgRole};
use teamgrid_shared::models::project_membership::ProjectRole;
use uuid::Uuid;
use validator::Validate;

/// Send invitation request
#[derive(Debug, Deserialize, Validate)]
pub struct SendInviteRequest {
    /// Email to invite
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Organization role to grant on accept (defaults to MEMBER)
    pub role: Option<OrgRole>,

    /// Optional project to grant on accept
    pub project_id: Option<Uuid>,

    /// Role for the project grant (defaults to MEMBER)
    pub project_role: Option<ProjectRole>,
}

/// Send invitation response
#[derive(Debug, Serialize)]
pub struct SendInviteResponse {
    /// The membership row driving the invitation
    pub membership: OrgMembership,

    /// What the call actually did
    pub outcome: String,

    /// Invitation token for delivery; absent when an existing member was
    /// updated in place
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_token: Option<String>,
}

/// Accept / reject request
#[derive(Debug, Deserialize)]
pub struct ResolveInviteRequest {
    /// Invitation token from the invite email
    pub token: String,
}

fn outcome_str(outcome: InviteOutcome) -> &'static str {
    match outcome {
        InviteOutcome::Invited => "invited",
        InviteOutcome::Reinvited => "reinvited",
        InviteOutcome::ExistingMemberUpdated => "existing_member_updated",
    }
}

/// Sends an invitation into the resolved organization
///
/// Inviting an email that already belongs to an active member updates their
/// role in place instead of issuing a token; a pending invitation for the
/// same email is a conflict; a previously rejected one is reissued.
pub async fn send_invite(
    State(state): State<AppState>,
    Extension(org_ctx): Extension<OrgContext>,
    Json(req): Json<SendInviteRequest>,
) -> ApiResult<(StatusCode, Json<SendInviteResponse>)> {
    req.validate().map_err(validation_error)?;

    let (membership, outcome) = state
        .invites
        .send_invite(
            org_ctx,
            SendInvite {
                invited_email: req.email,
                role: req.role.unwrap_or(OrgRole::Member),
                target_project_id: req.project_id,
                target_project_role: req.project_role,
            },
        )
        .await?;

    let invite_token = membership.invite_token.clone();

    let status = match outcome {
        InviteOutcome::ExistingMemberUpdated => StatusCode::OK,
        _ => StatusCode::CREATED,
    };

    Ok((
        status,
        Json(SendInviteResponse {
            membership,
            outcome: outcome_str(outcome).to_string(),
            invite_token,
        }),
    ))
}

/// Lists the organization's pending invitations
pub async fn list_pending(
    State(state): State<AppState>,
    Extension(org_ctx): Extension<OrgContext>,
) -> ApiResult<Json<Vec<OrgMembership>>> {
    require_operation(Operation::ManageInvites, org_ctx.role)?;

    let pending = OrgMembership::list_pending(&state.db, org_ctx.org_id).await?;
    Ok(Json(pending))
}

/// Reissues the token on an existing pending or rejected invitation
pub async fn resend_invite(
    State(state): State<AppState>,
    Extension(org_ctx): Extension<OrgContext>,
    Path(membership_id): Path<Uuid>,
) -> ApiResult<Json<SendInviteResponse>> {
    let membership = state.invites.resend_invite(org_ctx, membership_id).await?;
    let invite_token = membership.invite_token.clone();

    Ok(Json(SendInviteResponse {
        membership,
        outcome: outcome_str(InviteOutcome::Reinvited).to_string(),
        invite_token,
    }))
}

/// Accepts an invitation, activating the membership
pub async fn accept_invite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ResolveInviteRequest>,
) -> ApiResult<Json<OrgMembership>> {
    let membership = state.invites.accept_invite(&auth, &req.token).await?;
    Ok(Json(membership))
}

/// Rejects an invitation
pub async fn reject_invite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ResolveInviteRequest>,
) -> ApiResult<Json<OrgMembership>> {
    let membership = state.invites.reject_invite(&auth, &req.token).await?;
    Ok(Json(membership))
}
