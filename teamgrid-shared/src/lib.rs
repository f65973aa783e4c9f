//! # TeamGrid Shared Library
//!
//! This crate contains shared types, utilities, and business logic used by
//! the TeamGrid API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Token verification, password hashing, and role policy
//! - `guards`: Tenant and project access resolution (the guard chain)
//! - `invites`: Invitation lifecycle state machine
//! - `realtime`: Process-local notification fan-out registry
//! - `db`: Connection pool and migration helpers

pub mod auth;
pub mod db;
pub mod guards;
pub mod invites;
pub mod models;
pub mod realtime;

/// Current version of the TeamGrid shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
