/// Tenant context resolution
///
/// The tenant hint is a single request header (`X-Org-Id`) — **header-only
/// by policy**. The bearer token is never consulted for tenant context and
/// there is no fallback source: mixing header and token sources is how
/// tenant-confusion vulnerabilities happen (a stale token claiming org A
/// plus a header claiming org B must never silently resolve to either).
/// Header-only also lets one session operate against multiple organizations
/// by varying the header per request.

use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{GuardError, OrgContext};
use crate::models::org_membership::OrgMembership;

/// Header carrying the tenant hint
pub const ORG_HEADER: &str = "x-org-id";

/// Resolves the authoritative organization context for a request
///
/// The (user, org) membership must exist, have status ACTIVE, have the
/// activity flag set, and the organization must not be soft-deleted.
///
/// # Errors
///
/// - `GuardError::Forbidden` when any of those conditions fails. The error
///   is identical for "org doesn't exist" and "not a member" so tenants
///   cannot be enumerated.
pub async fn resolve_org_context(
    pool: &PgPool,
    user_id: Uuid,
    org_id: Uuid,
) -> Result<OrgContext, GuardError> {
    let role = OrgMembership::resolve_active_role(pool, org_id, user_id)
        .await?
        .ok_or(GuardError::Forbidden)?;

    debug!(%user_id, %org_id, role = role.as_str(), "Resolved tenant context");

    Ok(OrgContext { org_id, role })
}

/// Parses the raw tenant hint header value
///
/// A missing or malformed hint is a hard failure for org-scoped routes,
/// before any data access, for every role including OWNER.
pub fn parse_org_hint(raw: Option<&str>) -> Result<Uuid, GuardError> {
    let raw = raw.ok_or_else(|| {
        GuardError::BadRequest(format!("Missing {} header", ORG_HEADER))
    })?;

    Uuid::parse_str(raw)
        .map_err(|_| GuardError::BadRequest(format!("Malformed {} header", ORG_HEADER)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_org_hint_accepts_uuid() {
        let id = Uuid::new_v4();
        let parsed = parse_org_hint(Some(&id.to_string())).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_org_hint_missing_is_bad_request() {
        let err = parse_org_hint(None).unwrap_err();
        assert!(matches!(err, GuardError::BadRequest(_)));
    }

    #[test]
    fn test_parse_org_hint_malformed_is_bad_request() {
        let err = parse_org_hint(Some("not-a-uuid")).unwrap_err();
        assert!(matches!(err, GuardError::BadRequest(_)));
    }
}
