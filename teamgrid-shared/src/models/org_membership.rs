/// Organization membership model and database operations
///
/// This is the ternary relation (user, organization, role) at the heart of
/// tenant isolation. Each row also carries the invitation lifecycle: status,
/// the single-use invite token, its expiry, and optional project hints.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE org_role AS ENUM ('owner', 'admin', 'member');
/// CREATE TYPE membership_status AS ENUM ('invited', 'active', 'rejected');
///
/// CREATE TABLE org_memberships (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     org_id UUID NOT NULL REFERENCES organizations(id),
///     user_id UUID REFERENCES users(id),          -- NULL until accept for
///     invited_email CITEXT NOT NULL,              -- pre-signup invites
///     role org_role NOT NULL DEFAULT 'member',
///     status membership_status NOT NULL DEFAULT 'invited',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     invite_token VARCHAR(64) UNIQUE,
///     invite_expires_at TIMESTAMPTZ,
///     target_project_id UUID,
///     target_project_role VARCHAR(16),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Invariants
///
/// - At most one row per (org, user) pair and per (org, invited_email),
///   enforced by unique indexes.
/// - The invite token is single-use: consumption is the status transition
///   itself, guarded by `status = 'invited'` in the conditional UPDATE, so
///   concurrent accept attempts race on the row and exactly one wins. The
///   token and its expiry are nulled in the same statement, so a consumed
///   token can never be looked up again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::project_membership::ProjectRole;

/// Roles within an organization
///
/// Hierarchy: Owner > Admin > Member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "org_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    /// Full control: delete organization, manage all members
    Owner,

    /// Can manage members, invitations, and all projects in the org
    Admin,

    /// Can work within projects they belong to
    Member,
}

impl OrgRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::Owner => "owner",
            OrgRole::Admin => "admin",
            OrgRole::Member => "member",
        }
    }

    /// True for roles that may act on any project in the organization and
    /// manage invitations
    pub fn is_admin(&self) -> bool {
        matches!(self, OrgRole::Owner | OrgRole::Admin)
    }

    /// Checks if this role meets a required role
    ///
    /// Hierarchy: Owner > Admin > Member
    pub fn has_permission(&self, required: &OrgRole) -> bool {
        self.permission_level() >= required.permission_level()
    }

    fn permission_level(&self) -> u8 {
        match self {
            OrgRole::Owner => 3,
            OrgRole::Admin => 2,
            OrgRole::Member => 1,
        }
    }
}

/// Lifecycle status of an organization membership
///
/// Transitions: `Invited -> Active` (accept), `Invited -> Rejected` (reject),
/// `Rejected -> Invited` (resend).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    /// Invitation sent, not yet resolved
    Invited,

    /// Full member of the organization
    Active,

    /// Invitation was declined; may be re-invited
    Rejected,
}

impl MembershipStatus {
    /// Converts status to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Invited => "invited",
            MembershipStatus::Active => "active",
            MembershipStatus::Rejected => "rejected",
        }
    }
}

/// Organization membership row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrgMembership {
    /// Membership ID
    pub id: Uuid,

    /// Organization ID
    pub org_id: Uuid,

    /// User ID; None until a pre-signup invite is accepted
    pub user_id: Option<Uuid>,

    /// Email the invitation was addressed to
    pub invited_email: String,

    /// Role within the organization
    pub role: OrgRole,

    /// Lifecycle status
    pub status: MembershipStatus,

    /// Activity flag; inactive memberships never resolve a tenant context
    pub is_active: bool,

    /// Single-use invitation token; nulled when the invitation is resolved
    #[serde(skip_serializing)]
    pub invite_token: Option<String>,

    /// Invitation expiry
    pub invite_expires_at: Option<DateTime<Utc>>,

    /// Optional project the invitee should be granted on accept
    pub target_project_id: Option<Uuid>,

    /// Role for the target project grant
    pub target_project_role: Option<String>,

    /// When the membership was created
    pub created_at: DateTime<Utc>,

    /// When the membership was last updated
    pub updated_at: DateTime<Utc>,
}

impl OrgMembership {
    /// True if the invite token has passed its expiry
    pub fn is_invite_expired(&self, now: DateTime<Utc>) -> bool {
        match self.invite_expires_at {
            Some(expires_at) => now >= expires_at,
            None => true,
        }
    }

    /// Parses the target project role hint, defaulting to Member
    pub fn target_role(&self) -> ProjectRole {
        self.target_project_role
            .as_deref()
            .and_then(ProjectRole::parse)
            .unwrap_or(ProjectRole::Member)
    }
}

/// Input for creating an invited membership row
#[derive(Debug, Clone)]
pub struct CreateInvitedMembership {
    /// Organization ID
    pub org_id: Uuid,

    /// User ID if the invited email already has an account
    pub user_id: Option<Uuid>,

    /// Email the invitation is addressed to
    pub invited_email: String,

    /// Role to grant on accept
    pub role: OrgRole,

    /// Invitation token (single use)
    pub invite_token: String,

    /// Invitation expiry
    pub invite_expires_at: DateTime<Utc>,

    /// Optional project hint
    pub target_project_id: Option<Uuid>,

    /// Optional project role hint
    pub target_project_role: Option<ProjectRole>,
}

const MEMBERSHIP_COLUMNS: &str = "id, org_id, user_id, invited_email, role, status, is_active, \
     invite_token, invite_expires_at, target_project_id, target_project_role, \
     created_at, updated_at";

impl OrgMembership {
    /// Creates an active membership row directly (no invitation)
    ///
    /// Used when a user creates an organization and becomes its owner.
    pub async fn create_active(
        pool: &PgPool,
        org_id: Uuid,
        user_id: Uuid,
        email: &str,
        role: OrgRole,
    ) -> Result<Self, sqlx::Error> {
        let membership = sqlx::query_as::<_, OrgMembership>(&format!(
            r#"
            INSERT INTO org_memberships (org_id, user_id, invited_email, role, status)
            VALUES ($1, $2, $3, $4, 'active')
            RETURNING {MEMBERSHIP_COLUMNS}
            "#,
        ))
        .bind(org_id)
        .bind(user_id)
        .bind(email)
        .bind(role)
        .fetch_one(pool)
        .await?;

        Ok(membership)
    }

    /// Creates an invited membership row
    ///
    /// # Errors
    ///
    /// Fails with a unique constraint violation if the (org, email) or
    /// (org, user) pair already has a row.
    pub async fn create_invited(
        pool: &PgPool,
        data: CreateInvitedMembership,
    ) -> Result<Self, sqlx::Error> {
        let membership = sqlx::query_as::<_, OrgMembership>(&format!(
            r#"
            INSERT INTO org_memberships
                (org_id, user_id, invited_email, role, status,
                 invite_token, invite_expires_at, target_project_id, target_project_role)
            VALUES ($1, $2, $3, $4, 'invited', $5, $6, $7, $8)
            RETURNING {MEMBERSHIP_COLUMNS}
            "#,
        ))
        .bind(data.org_id)
        .bind(data.user_id)
        .bind(data.invited_email)
        .bind(data.role)
        .bind(data.invite_token)
        .bind(data.invite_expires_at)
        .bind(data.target_project_id)
        .bind(data.target_project_role.map(|r| r.as_str().to_string()))
        .fetch_one(pool)
        .await?;

        Ok(membership)
    }

    /// Finds a membership by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, OrgMembership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM org_memberships WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Finds the unique membership for a (org, user) pair
    pub async fn find_by_org_and_user(
        pool: &PgPool,
        org_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, OrgMembership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM org_memberships \
             WHERE org_id = $1 AND user_id = $2",
        ))
        .bind(org_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Finds the membership row for a (org, email) pair
    pub async fn find_by_org_and_email(
        pool: &PgPool,
        org_id: Uuid,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, OrgMembership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM org_memberships \
             WHERE org_id = $1 AND invited_email = $2",
        ))
        .bind(org_id)
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Finds a membership by its invitation token
    pub async fn find_by_token(pool: &PgPool, token: &str) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, OrgMembership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM org_memberships WHERE invite_token = $1",
        ))
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Resolves the caller's tenant context for an organization
    ///
    /// Returns the role only when the membership is ACTIVE, the activity flag
    /// is set, and the organization itself is not soft-deleted. This is the
    /// single source of truth for the tenant context resolver.
    pub async fn resolve_active_role(
        pool: &PgPool,
        org_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrgRole>, sqlx::Error> {
        let role: Option<OrgRole> = sqlx::query_scalar(
            r#"
            SELECT m.role
            FROM org_memberships m
            JOIN organizations o ON o.id = m.org_id
            WHERE m.org_id = $1
              AND m.user_id = $2
              AND m.status = 'active'
              AND m.is_active
              AND o.deleted_at IS NULL
            "#,
        )
        .bind(org_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(role)
    }

    /// Updates the role of an existing membership in place
    pub async fn update_role(
        pool: &PgPool,
        id: Uuid,
        role: OrgRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, OrgMembership>(&format!(
            r#"
            UPDATE org_memberships
            SET role = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {MEMBERSHIP_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Issues a fresh invitation token on an existing non-ACTIVE row
    ///
    /// Resets status to INVITED without altering the role. Returns None if
    /// the row is missing or already ACTIVE.
    pub async fn reissue_invite(
        pool: &PgPool,
        id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, OrgMembership>(&format!(
            r#"
            UPDATE org_memberships
            SET status = 'invited',
                invite_token = $2,
                invite_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1 AND status <> 'active'
            RETURNING {MEMBERSHIP_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(token)
        .bind(expires_at)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Consumes an invitation token, transitioning INVITED -> ACTIVE
    ///
    /// This is the conditional update that makes accepts race-safe: the WHERE
    /// clause only matches an unconsumed INVITED row, so of two concurrent
    /// accepts exactly one sees a row. Binds `user_id` (pre-signup linking)
    /// and nulls the token and its expiry in the same statement. Must run
    /// inside the accept transaction together with any project grant.
    pub async fn consume_token_accept<'e, E: PgExecutor<'e>>(
        executor: E,
        token: &str,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, OrgMembership>(&format!(
            r#"
            UPDATE org_memberships
            SET status = 'active',
                user_id = $2,
                invite_token = NULL,
                invite_expires_at = NULL,
                updated_at = NOW()
            WHERE invite_token = $1
              AND status = 'invited'
              AND (user_id IS NULL OR user_id = $2)
            RETURNING {MEMBERSHIP_COLUMNS}
            "#,
        ))
        .bind(token)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(membership)
    }

    /// Consumes an invitation token, transitioning INVITED -> REJECTED
    ///
    /// Nulls the token and its expiry like the accept path; a later re-invite
    /// issues a fresh token on the same row.
    pub async fn consume_token_reject(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, OrgMembership>(&format!(
            r#"
            UPDATE org_memberships
            SET status = 'rejected',
                invite_token = NULL,
                invite_expires_at = NULL,
                updated_at = NOW()
            WHERE invite_token = $1 AND status = 'invited'
            RETURNING {MEMBERSHIP_COLUMNS}
            "#,
        ))
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Clears the activity flag without touching status or history
    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE org_memberships SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists all memberships of an organization
    pub async fn list_by_org(pool: &PgPool, org_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let memberships = sqlx::query_as::<_, OrgMembership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM org_memberships \
             WHERE org_id = $1 ORDER BY created_at ASC",
        ))
        .bind(org_id)
        .fetch_all(pool)
        .await?;

        Ok(memberships)
    }

    /// Lists pending invitations of an organization
    pub async fn list_pending(pool: &PgPool, org_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let memberships = sqlx::query_as::<_, OrgMembership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM org_memberships \
             WHERE org_id = $1 AND status = 'invited' ORDER BY created_at ASC",
        ))
        .bind(org_id)
        .fetch_all(pool)
        .await?;

        Ok(memberships)
    }

    /// User IDs of active admins and owners of an organization
    ///
    /// Used to fan lifecycle events out to the administrative counterpart.
    pub async fn list_admin_user_ids(
        pool: &PgPool,
        org_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT user_id FROM org_memberships
            WHERE org_id = $1
              AND user_id IS NOT NULL
              AND status = 'active'
              AND is_active
              AND role IN ('owner', 'admin')
            "#,
        )
        .bind(org_id)
        .fetch_all(pool)
        .await?;

        Ok(ids)
    }
}

/// A user's view of one of their organizations (membership joined with org)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserOrg {
    /// Organization ID
    pub org_id: Uuid,

    /// Organization name
    pub name: String,

    /// Organization slug
    pub slug: String,

    /// Caller's role in the organization
    pub role: OrgRole,
}

impl UserOrg {
    /// Lists the organizations a user is an active member of
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let orgs = sqlx::query_as::<_, UserOrg>(
            r#"
            SELECT o.id AS org_id, o.name, o.slug, m.role
            FROM org_memberships m
            JOIN organizations o ON o.id = m.org_id
            WHERE m.user_id = $1
              AND m.status = 'active'
              AND m.is_active
              AND o.deleted_at IS NULL
            ORDER BY o.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(orgs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_org_role_hierarchy() {
        assert!(OrgRole::Owner.has_permission(&OrgRole::Admin));
        assert!(OrgRole::Owner.has_permission(&OrgRole::Member));
        assert!(OrgRole::Admin.has_permission(&OrgRole::Member));
        assert!(!OrgRole::Admin.has_permission(&OrgRole::Owner));
        assert!(!OrgRole::Member.has_permission(&OrgRole::Admin));
    }

    #[test]
    fn test_org_role_is_admin() {
        assert!(OrgRole::Owner.is_admin());
        assert!(OrgRole::Admin.is_admin());
        assert!(!OrgRole::Member.is_admin());
    }

    #[test]
    fn test_status_as_str() {
        assert_eq!(MembershipStatus::Invited.as_str(), "invited");
        assert_eq!(MembershipStatus::Active.as_str(), "active");
        assert_eq!(MembershipStatus::Rejected.as_str(), "rejected");
    }

    fn membership_with_expiry(expires_at: Option<DateTime<Utc>>) -> OrgMembership {
        OrgMembership {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            user_id: None,
            invited_email: "invitee@example.com".to_string(),
            role: OrgRole::Member,
            status: MembershipStatus::Invited,
            is_active: true,
            invite_token: Some("tok".to_string()),
            invite_expires_at: expires_at,
            target_project_id: None,
            target_project_role: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_invite_expiry() {
        let now = Utc::now();

        let fresh = membership_with_expiry(Some(now + Duration::hours(1)));
        assert!(!fresh.is_invite_expired(now));

        let stale = membership_with_expiry(Some(now - Duration::seconds(1)));
        assert!(stale.is_invite_expired(now));

        // A row with no expiry at all is treated as expired, never open-ended.
        let missing = membership_with_expiry(None);
        assert!(missing.is_invite_expired(now));
    }

    #[test]
    fn test_target_role_defaults_to_member() {
        let mut m = membership_with_expiry(None);
        assert_eq!(m.target_role(), ProjectRole::Member);

        m.target_project_role = Some("viewer".to_string());
        assert_eq!(m.target_role(), ProjectRole::Viewer);

        m.target_project_role = Some("bogus".to_string());
        assert_eq!(m.target_role(), ProjectRole::Member);
    }
}
