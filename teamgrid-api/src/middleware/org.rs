/// Tenant context resolution middleware
///
/// Second stage of the guard chain, layered under `require_auth` on every
/// org-scoped route. Reads the `X-Org-Id` header (the only tenant source),
/// resolves the caller's active membership, and attaches `OrgContext` to
/// request extensions. A missing or malformed header fails with 400 before
/// any data access; a missing membership fails with 403 that never reveals
/// whether the organization exists.

use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use teamgrid_shared::guards::tenant::{parse_org_hint, resolve_org_context, ORG_HEADER};
use teamgrid_shared::guards::AuthUser;

use crate::{app::AppState, error::ApiError};

/// Resolves and injects `OrgContext` from the tenant hint header
pub async fn require_org_context(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let raw_hint = req
        .headers()
        .get(ORG_HEADER)
        .and_then(|v| v.to_str().ok());

    let org_id = parse_org_hint(raw_hint)?;
    let org_ctx = resolve_org_context(&state.db, user.user_id, org_id).await?;

    req.extensions_mut().insert(org_ctx);

    Ok(next.run(req).await)
}
