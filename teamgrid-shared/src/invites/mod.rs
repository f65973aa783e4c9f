/// Invitation lifecycle manager
///
/// Drives the membership state machine:
///
/// ```text
/// (none) --send--> INVITED --accept--> ACTIVE
///                     |
///                     +-----reject--> REJECTED --resend--> INVITED
/// ```
///
/// Accept and reject consume the single-use token through a conditional
/// UPDATE, so two concurrent attempts on the same token resolve to exactly
/// one winner; the loser observes zero updated rows and gets
/// [`InviteError::AlreadyProcessed`].
///
/// Every transition persists a notification row and pushes a realtime event
/// through the fan-out registry. Both are best-effort side effects: a failed
/// notification write or a closed connection never rolls back the state
/// transition itself.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::opaque::{generate_token, INVITE_TOKEN_LENGTH};
use crate::auth::policy::{require_operation, Operation};
use crate::guards::{AuthUser, GuardError, OrgContext};
use crate::models::org_membership::{
    CreateInvitedMembership, MembershipStatus, OrgMembership, OrgRole,
};
use crate::models::organization::Organization;
use crate::models::project::Project;
use crate::models::project_membership::{ProjectMembership, ProjectRole};
use crate::models::notification::Notification;
use crate::models::user::User;
use crate::realtime::{ConnectionRegistry, LifecycleEvent};

/// Error type for invitation operations
#[derive(Debug, thiserror::Error)]
pub enum InviteError {
    /// Requester lacks the role for this operation, or the token belongs to
    /// a different account
    #[error("Not authorized for this operation")]
    Forbidden,

    /// A pending invitation for this email already exists in the organization
    #[error("An invitation for this email is already pending")]
    Conflict,

    /// No membership matches the given token or ID. Consumed tokens are
    /// nulled, so replays land here too.
    #[error("Invitation not found")]
    NotFound,

    /// The invitation was resolved while this request was in flight
    #[error("Invitation has already been processed")]
    AlreadyProcessed,

    /// The token has passed its expiry; a new invitation must be issued
    #[error("Invitation has expired")]
    Expired,

    /// The authenticated account's email does not match the invitation
    #[error("Invitation was issued to a different email address")]
    EmailMismatch,

    /// The project hint does not name a live project in the organization
    #[error("Target project not found in this organization")]
    BadProjectHint,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<GuardError> for InviteError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::Forbidden | GuardError::Unauthenticated => InviteError::Forbidden,
            GuardError::NotFound => InviteError::NotFound,
            GuardError::BadRequest(_) => InviteError::BadProjectHint,
            GuardError::DatabaseError(e) => InviteError::Database(e),
        }
    }
}

/// Input for sending an invitation
#[derive(Debug, Clone)]
pub struct SendInvite {
    /// Email to invite; the account may or may not exist yet
    pub invited_email: String,

    /// Organization role to grant on accept
    pub role: OrgRole,

    /// Optional project to grant on accept
    pub target_project_id: Option<Uuid>,

    /// Role for the project grant; defaults to Member when absent
    pub target_project_role: Option<ProjectRole>,
}

/// What sending an invitation actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteOutcome {
    /// A fresh invitation row was created
    Invited,

    /// A previously rejected invitation was reissued with a new token
    Reinvited,

    /// The email already belongs to an active member; their role (and any
    /// project hint) was applied in place, no token issued
    ExistingMemberUpdated,
}

/// Coordinates invitation state transitions, notifications, and fan-out
#[derive(Clone)]
pub struct InvitationManager {
    pool: PgPool,
    registry: ConnectionRegistry,
    invite_ttl: Duration,
}

impl InvitationManager {
    pub fn new(pool: PgPool, registry: ConnectionRegistry, invite_ttl: Duration) -> Self {
        Self {
            pool,
            registry,
            invite_ttl,
        }
    }

    /// Sends (or re-sends, or applies in place) an invitation
    ///
    /// Requires the ManageInvites operation on the requester's resolved
    /// context. The returned membership row carries the invitation token for
    /// delivery; callers must not log it.
    ///
    /// # Errors
    ///
    /// - `InviteError::Forbidden` if the requester is not ADMIN or OWNER
    /// - `InviteError::Conflict` if a pending invitation already exists
    /// - `InviteError::BadProjectHint` if the project hint does not name a
    ///   live project in this organization
    pub async fn send_invite(
        &self,
        org_ctx: OrgContext,
        invite: SendInvite,
    ) -> Result<(OrgMembership, InviteOutcome), InviteError> {
        require_operation(Operation::ManageInvites, org_ctx.role)?;

        if let Some(project_id) = invite.target_project_id {
            let project = Project::find_by_id(&self.pool, project_id)
                .await?
                .ok_or(InviteError::BadProjectHint)?;
            if project.org_id != org_ctx.org_id {
                return Err(InviteError::BadProjectHint);
            }
        }

        let existing =
            OrgMembership::find_by_org_and_email(&self.pool, org_ctx.org_id, &invite.invited_email)
                .await?;

        match existing {
            Some(membership) => match membership.status {
                MembershipStatus::Active => {
                    self.update_existing_member(org_ctx.org_id, membership, invite)
                        .await
                }
                MembershipStatus::Invited => Err(InviteError::Conflict),
                MembershipStatus::Rejected => self.reissue(org_ctx.org_id, membership).await,
            },
            None => self.create_fresh(org_ctx.org_id, invite).await,
        }
    }

    /// Accepts an invitation on behalf of the authenticated user
    ///
    /// The token is consumed atomically: status flips to ACTIVE, the user is
    /// bound to the row (pre-signup invitations carry no user until now), and
    /// any project hint is granted in the same transaction.
    ///
    /// # Errors
    ///
    /// - `InviteError::NotFound` if no row carries this token; consumption
    ///   nulls the token, so a replay fails here
    /// - `InviteError::AlreadyProcessed` if a concurrent request consumed it
    /// - `InviteError::EmailMismatch` if the caller's account email differs
    ///   from the invited email, checked before expiry
    /// - `InviteError::Expired` if the token is past its expiry
    pub async fn accept_invite(
        &self,
        user: &AuthUser,
        token: &str,
    ) -> Result<OrgMembership, InviteError> {
        let membership = self.load_pending(user, token).await?;

        let mut tx = self.pool.begin().await?;

        let accepted = OrgMembership::consume_token_accept(&mut *tx, token, user.user_id)
            .await?
            // Lost the race between the pre-check and the update.
            .ok_or(InviteError::AlreadyProcessed)?;

        if let Some(project_id) = accepted.target_project_id {
            // Grant the project hint only if the project is still live; a
            // soft-deleted project silently drops the hint.
            if let Some(project) = Project::find_by_id(&self.pool, project_id).await? {
                if project.org_id == accepted.org_id {
                    ProjectMembership::upsert(
                        &mut *tx,
                        project.id,
                        user.user_id,
                        accepted.target_role(),
                    )
                    .await?;
                }
            }
        }

        tx.commit().await?;

        info!(
            org_id = %accepted.org_id,
            membership_id = %accepted.id,
            "Invitation accepted"
        );

        self.notify_org_admins(
            accepted.org_id,
            LifecycleEvent::InviteAccepted {
                org_id: accepted.org_id,
                membership_id: accepted.id,
                invited_email: accepted.invited_email.clone(),
            },
        )
        .await;

        Ok(accepted)
    }

    /// Rejects an invitation on behalf of the authenticated user
    ///
    /// Same validation and race semantics as accept, transitioning the row to
    /// REJECTED instead. A rejected row may later be re-invited.
    pub async fn reject_invite(
        &self,
        user: &AuthUser,
        token: &str,
    ) -> Result<OrgMembership, InviteError> {
        self.load_pending(user, token).await?;

        let rejected = OrgMembership::consume_token_reject(&self.pool, token)
            .await?
            .ok_or(InviteError::AlreadyProcessed)?;

        info!(
            org_id = %rejected.org_id,
            membership_id = %rejected.id,
            "Invitation rejected"
        );

        self.notify_org_admins(
            rejected.org_id,
            LifecycleEvent::InviteRejected {
                org_id: rejected.org_id,
                membership_id: rejected.id,
                invited_email: rejected.invited_email.clone(),
            },
        )
        .await;

        Ok(rejected)
    }

    /// Reissues the token on an existing pending or rejected invitation
    ///
    /// Used when the original token expired or the email never arrived.
    pub async fn resend_invite(
        &self,
        org_ctx: OrgContext,
        membership_id: Uuid,
    ) -> Result<OrgMembership, InviteError> {
        require_operation(Operation::ManageInvites, org_ctx.role)?;

        let membership = OrgMembership::find_by_id(&self.pool, membership_id)
            .await?
            .ok_or(InviteError::NotFound)?;

        // Cross-org membership IDs are indistinguishable from absent ones.
        if membership.org_id != org_ctx.org_id {
            return Err(InviteError::NotFound);
        }

        self.reissue(org_ctx.org_id, membership).await.map(|(m, _)| m)
    }

    /// Common pre-checks for accept and reject
    async fn load_pending(
        &self,
        user: &AuthUser,
        token: &str,
    ) -> Result<OrgMembership, InviteError> {
        let membership = OrgMembership::find_by_token(&self.pool, token)
            .await?
            .ok_or(InviteError::NotFound)?;

        if membership.status != MembershipStatus::Invited {
            return Err(InviteError::AlreadyProcessed);
        }

        // Identity checks come before expiry: the wrong account is always
        // Forbidden, whether or not the token is still live.
        // CITEXT makes the stored email case-insensitive; compare likewise.
        if !membership.invited_email.eq_ignore_ascii_case(&user.email) {
            return Err(InviteError::EmailMismatch);
        }

        if let Some(bound) = membership.user_id {
            if bound != user.user_id {
                return Err(InviteError::Forbidden);
            }
        }

        if membership.is_invite_expired(Utc::now()) {
            return Err(InviteError::Expired);
        }

        Ok(membership)
    }

    async fn create_fresh(
        &self,
        org_id: Uuid,
        invite: SendInvite,
    ) -> Result<(OrgMembership, InviteOutcome), InviteError> {
        // Link the invitation to an existing account up front so the accept
        // update can enforce that only that account consumes the token.
        let existing_user = User::find_by_email(&self.pool, &invite.invited_email).await?;

        let membership = OrgMembership::create_invited(
            &self.pool,
            CreateInvitedMembership {
                org_id,
                user_id: existing_user.as_ref().map(|u| u.id),
                invited_email: invite.invited_email,
                role: invite.role,
                invite_token: generate_token(INVITE_TOKEN_LENGTH),
                invite_expires_at: Utc::now() + self.invite_ttl,
                target_project_id: invite.target_project_id,
                target_project_role: invite.target_project_role,
            },
        )
        .await?;

        info!(%org_id, membership_id = %membership.id, "Invitation created");

        if let Some(user) = existing_user {
            self.notify_invitee(user.id, org_id, &membership.invited_email)
                .await;
        }

        Ok((membership, InviteOutcome::Invited))
    }

    async fn reissue(
        &self,
        org_id: Uuid,
        membership: OrgMembership,
    ) -> Result<(OrgMembership, InviteOutcome), InviteError> {
        let reissued = OrgMembership::reissue_invite(
            &self.pool,
            membership.id,
            &generate_token(INVITE_TOKEN_LENGTH),
            Utc::now() + self.invite_ttl,
        )
        .await?
        .ok_or(InviteError::Conflict)?;

        info!(%org_id, membership_id = %reissued.id, "Invitation reissued");

        if let Some(user_id) = reissued.user_id {
            self.notify_invitee(user_id, org_id, &reissued.invited_email)
                .await;
        }

        Ok((reissued, InviteOutcome::Reinvited))
    }

    async fn update_existing_member(
        &self,
        org_id: Uuid,
        membership: OrgMembership,
        invite: SendInvite,
    ) -> Result<(OrgMembership, InviteOutcome), InviteError> {
        let updated = OrgMembership::update_role(&self.pool, membership.id, invite.role)
            .await?
            .ok_or(InviteError::NotFound)?;

        if let (Some(project_id), Some(user_id)) = (invite.target_project_id, updated.user_id) {
            let role = invite.target_project_role.unwrap_or(ProjectRole::Member);
            ProjectMembership::upsert(&self.pool, project_id, user_id, role).await?;
        }

        info!(%org_id, membership_id = %updated.id, "Existing member updated in place");

        if let Some(user_id) = updated.user_id {
            self.deliver(
                user_id,
                LifecycleEvent::RoleUpdated {
                    org_id,
                    role: updated.role.as_str().to_string(),
                },
            )
            .await;
        }

        Ok((updated, InviteOutcome::ExistingMemberUpdated))
    }

    async fn notify_invitee(&self, user_id: Uuid, org_id: Uuid, invited_email: &str) {
        let org_name = match Organization::find_by_id(&self.pool, org_id).await {
            Ok(Some(org)) => org.name,
            Ok(None) => return,
            Err(err) => {
                warn!(%org_id, error = %err, "Failed to load organization for notification");
                return;
            }
        };

        self.deliver(
            user_id,
            LifecycleEvent::InviteReceived {
                org_id,
                org_name,
                invited_email: invited_email.to_string(),
            },
        )
        .await;
    }

    async fn notify_org_admins(&self, org_id: Uuid, event: LifecycleEvent) {
        let admin_ids = match OrgMembership::list_admin_user_ids(&self.pool, org_id).await {
            Ok(ids) => ids,
            Err(err) => {
                warn!(%org_id, error = %err, "Failed to resolve admin recipients");
                return;
            }
        };

        for admin_id in admin_ids {
            self.deliver(admin_id, event.clone()).await;
        }
    }

    /// Persists the notification row and pushes the realtime event
    ///
    /// Best-effort on both legs: a failed write is logged, a user with no
    /// live connection simply gets nothing pushed.
    async fn deliver(&self, user_id: Uuid, event: LifecycleEvent) {
        match serde_json::to_value(&event) {
            Ok(payload) => {
                if let Err(err) =
                    Notification::create(&self.pool, user_id, event.kind(), payload).await
                {
                    warn!(%user_id, error = %err, "Failed to persist notification");
                }
            }
            Err(err) => {
                warn!(%user_id, error = %err, "Failed to serialize notification payload");
            }
        }

        self.registry.publish(user_id, event).await;
    }
}
