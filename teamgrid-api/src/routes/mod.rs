/// API route handlers
///
/// # Modules
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh, logout, password change
/// - `orgs`: Organization and membership management
/// - `invites`: Invitation lifecycle endpoints
/// - `projects`: Project and project membership endpoints
/// - `notifications`: Notification polling and SSE stream

pub mod auth;
pub mod health;
pub mod invites;
pub mod notifications;
pub mod orgs;
pub mod projects;
