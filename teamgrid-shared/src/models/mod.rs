/// Database models for TeamGrid
///
/// # Modules
///
/// - `user`: User accounts (identity records)
/// - `organization`: Organizations (the tenant boundary)
/// - `org_membership`: User-organization relation carrying role, status,
///   and the invitation token
/// - `project`: Projects within an organization
/// - `project_membership`: User-project relation
/// - `refresh_token`: Long-lived opaque session credentials
/// - `notification`: Persisted notifications (durable realtime fallback)
/// - `cascade`: Explicit cascade soft-delete functions

pub mod cascade;
pub mod notification;
pub mod org_membership;
pub mod organization;
pub mod project;
pub mod project_membership;
pub mod refresh_token;
pub mod user;
