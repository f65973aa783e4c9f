//! # TeamGrid API Server Library
//!
//! Core functionality for the TeamGrid API server: a multi-tenant project
//! and task backend where every request passes through an ordered guard
//! chain (token verification, tenant context resolution, project access,
//! role policy) before touching data.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Guard-chain middleware and security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
