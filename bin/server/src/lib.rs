//! tollgate HTTP server.
//!
//! Exposes the OIDC login flow for the configured providers, email/password
//! login, first-admin bootstrap and a bearer-protected `/auth/me` route, all
//! backed by Postgres.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
