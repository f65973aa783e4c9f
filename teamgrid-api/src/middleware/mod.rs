/// HTTP middleware for the API server
///
/// # Modules
///
/// - `auth`: Bearer token verification (identity only)
/// - `org`: Tenant context resolution from the `X-Org-Id` header
/// - `security`: Security response headers

pub mod auth;
pub mod org;
pub mod security;
