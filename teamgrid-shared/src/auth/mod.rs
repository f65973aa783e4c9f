/// Authentication and authorization utilities
///
/// # Modules
///
/// - `jwt`: Identity-only access token creation and validation
/// - `password`: Argon2id password hashing and verification
/// - `opaque`: Random opaque tokens (invites, refresh secrets) and their
///   salted-hash storage form
/// - `policy`: Static per-operation role requirements

pub mod jwt;
pub mod opaque;
pub mod password;
pub mod policy;
