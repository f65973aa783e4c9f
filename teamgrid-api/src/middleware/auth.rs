/// Bearer token verification middleware
///
/// First stage of the guard chain. Validates the access token and attaches
/// the verified identity (`AuthUser`) to request extensions. The token
/// carries no organization or role information, so nothing tenant-related is
/// established here.
///
/// The claims' `token_version` is checked against the user row: a password
/// change bumps the version and instantly orphans every access token issued
/// before it, without waiting out the 15-minute expiry.

use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use teamgrid_shared::auth::jwt;
use teamgrid_shared::guards::AuthUser;
use teamgrid_shared::models::user::User;

use crate::{app::AppState, error::ApiError};

/// Validates the Authorization header and injects `AuthUser`
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::BadRequest("Expected Bearer token".to_string()))?;

    let claims = jwt::validate_access_token(token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

    if user.token_version != claims.token_version {
        return Err(ApiError::Unauthorized("Token has been revoked".to_string()));
    }

    req.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        email: claims.email,
    });

    Ok(next.run(req).await)
}
