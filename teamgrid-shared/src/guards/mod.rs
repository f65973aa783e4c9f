/// The guard chain: request-scoped authorization stages
///
/// Every request passes through an ordered sequence of checks:
///
/// 1. **Token verification** — validates the bearer credential and extracts
///    identity only (`AuthUser`); no org or role information.
/// 2. **Tenant context resolution** — derives the authoritative organization
///    and the caller's role from the `X-Org-Id` header (`OrgContext`).
/// 3. **Project access resolution** (project-scoped routes) — checks
///    explicit project membership or the org-admin override
///    (`ProjectContext`).
/// 4. **Role policy** — the static per-operation table in `auth::policy`.
///
/// Each stage fails fast; no stage catches or downgrades a failure from an
/// earlier one. Forbidden responses are deliberately non-enumerable: a
/// caller can never tell "organization doesn't exist" apart from "you are
/// not a member".

pub mod project_access;
pub mod tenant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::org_membership::OrgRole;
use crate::models::project_membership::ProjectRole;

/// Error type for guard-chain stages
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// Credential missing, malformed, expired, or failing verification
    #[error("Authentication required")]
    Unauthenticated,

    /// Authenticated but not authorized for this tenant/project/role.
    /// Carries no detail: the same error covers a missing organization, a
    /// missing membership, and an insufficient role.
    #[error("Not authorized for this resource")]
    Forbidden,

    /// Resource genuinely absent after authorization
    #[error("Resource not found")]
    NotFound,

    /// Malformed tenant hint or other unusable request input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Verified identity attached to the request by the token verifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Email from the verified credential
    pub email: String,
}

/// Resolved tenant context attached by the tenant context resolver
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrgContext {
    /// Authoritative organization for this request
    pub org_id: Uuid,

    /// Caller's role within it
    pub role: OrgRole,
}

/// Resolved project context attached by the project access resolver
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProjectContext {
    /// Project the caller may act on
    pub project_id: Uuid,

    /// The project's organization (always equal to the resolved tenant
    /// context under the strict policy)
    pub org_id: Uuid,

    /// Caller's effective role within the project
    pub project_role: ProjectRole,
}
