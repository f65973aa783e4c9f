/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register new user
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Rotate a refresh token for new tokens
/// - `POST /v1/auth/logout` - Revoke a refresh token
/// - `POST /v1/auth/password` - Change password (authenticated)
///
/// Access tokens are identity-only JWTs; they never carry an organization or
/// role. Refresh tokens are opaque and stored hashed. A password change bumps
/// the user's token version, which orphans every outstanding access token,
/// and sets the bulk-invalidation instant, which kills all prior refresh
/// tokens.

use crate::{
    app::AppState,
    error::{validation_error, ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use teamgrid_shared::auth::{jwt, password};
use teamgrid_shared::guards::AuthUser;
use teamgrid_shared::models::refresh_token::RefreshToken;
use teamgrid_shared::models::user::{CreateUser, User};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (will be validated for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Optional display name
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Token pair returned by register, login, refresh, and password change
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// User ID
    pub user_id: String,

    /// Short-lived access token
    pub access_token: String,

    /// Opaque refresh token
    pub refresh_token: String,
}

/// Refresh / logout request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Opaque refresh token
    pub refresh_token: String,
}

/// Password change request
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    /// Current password
    pub current_password: String,

    /// New password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// Issues an access/refresh pair for a user
async fn issue_tokens(state: &AppState, user: &User) -> ApiResult<TokenResponse> {
    let email = user
        .email
        .clone()
        .ok_or_else(|| ApiError::InternalError("Account has no email".to_string()))?;

    let claims = jwt::Claims::new(user.id, &email, user.token_version, state.config.access_ttl());
    let access_token = jwt::create_token(&claims, state.jwt_secret())?;

    let (_, refresh_token) =
        RefreshToken::issue(&state.db, user.id, state.config.refresh_ttl()).await?;

    Ok(TokenResponse {
        user_id: user.id.to_string(),
        access_token,
        refresh_token,
    })
}

/// Register a new user
///
/// Creates a bare identity record; organizations are created separately via
/// `POST /v1/orgs`. If the email was invited somewhere before signup, those
/// invitations are already linked by email and become acceptable immediately.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Email already exists
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    req.validate().map_err(validation_error)?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: Some(req.email),
            username: None,
            phone: None,
            password_hash: Some(password_hash),
            name: req.name,
        },
    )
    .await?;

    let tokens = issue_tokens(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(tokens)))
}

/// Login with email and password
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials (same response whether the
///   email is unknown or the password wrong)
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate().map_err(validation_error)?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    // Social-login-only accounts have no password credential.
    let hash = user.password_hash.as_deref().ok_or_else(invalid)?;

    if !password::verify_password(&req.password, hash)? {
        return Err(invalid());
    }

    User::update_last_login(&state.db, user.id).await?;

    let tokens = issue_tokens(&state, &user).await?;
    Ok(Json(tokens))
}

/// Rotate a refresh token
///
/// The presented token is revoked and a fresh pair is issued. Tokens issued
/// before the user's bulk-invalidation instant are rejected.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid, expired, revoked, or bulk-invalidated token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let invalid = || ApiError::Unauthorized("Invalid refresh token".to_string());

    // Two-step: load the row ignoring the bulk cutoff first, since the cutoff
    // lives on the user row.
    let row = RefreshToken::find_valid(&state.db, &req.refresh_token, None)
        .await?
        .ok_or_else(invalid)?;

    let user = User::find_by_id(&state.db, row.user_id)
        .await?
        .ok_or_else(invalid)?;

    if let Some(cutoff) = user.sessions_invalidated_at {
        if row.created_at < cutoff {
            return Err(invalid());
        }
    }

    // Single-use rotation.
    RefreshToken::revoke(&state.db, row.id).await?;

    let tokens = issue_tokens(&state, &user).await?;
    Ok(Json(tokens))
}

/// Revoke a refresh token
///
/// Idempotent: an unknown or already-revoked token still returns 204, so a
/// client can always safely log out.
pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<StatusCode> {
    if let Some(row) = RefreshToken::find_valid(&state.db, &req.refresh_token, None).await? {
        RefreshToken::revoke(&state.db, row.id).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Change the authenticated user's password
///
/// Bumps the token version (orphaning all outstanding access tokens) and
/// sets the bulk-invalidation instant (killing all prior refresh tokens),
/// then issues a fresh pair so this session stays logged in.
///
/// # Errors
///
/// - `401 Unauthorized`: Current password is wrong
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate().map_err(validation_error)?;

    password::validate_password_strength(&req.new_password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "new_password".to_string(),
            message: e,
        }])
    })?;

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))?;

    let hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("Account has no password credential".to_string()))?;

    if !password::verify_password(&req.current_password, hash)? {
        return Err(ApiError::Unauthorized("Current password is incorrect".to_string()));
    }

    let new_hash = password::hash_password(&req.new_password)?;
    User::set_password(&state.db, user.id, &new_hash).await?;

    // Reload to pick up the bumped token version.
    let user = User::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::InternalError("User disappeared".to_string()))?;

    let tokens = issue_tokens(&state, &user).await?;
    Ok(Json(tokens))
}
