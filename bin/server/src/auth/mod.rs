//! Authentication module for the tollgate server.
//!
//! This module provides:
//! - The OIDC authorization-code flow against the configured providers
//! - Email/password login and first-admin bootstrap endpoints
//! - Bearer-token middleware for protected routes
//!
//! Sessions are stateless: a successful login returns a signed JWT and the
//! server keeps no record of it.

pub mod flow;
pub mod middleware;
pub mod oidc;
pub mod provider;
pub mod registry;
pub mod routes;

#[cfg(test)]
mod tests;

use axum::{
    Router,
    routing::{get, post},
};
use rootcause::Report;
use std::sync::Arc;
use tollgate_identity::{
    AuthConfig, AuthError, IdentityLinker, IdentityStore, JwtIssuer, PasswordAuthService,
    RoleStore, TokenCipher, UserStore,
};

pub use middleware::{AuthContext, require_bearer};
pub use oidc::OidcClient;
pub use provider::{AuthRequest, IdentityProvider, ProviderLogin};
pub use registry::ProviderRegistry;

/// Storage handles the authentication services run against.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub identities: Arc<dyn IdentityStore>,
    pub roles: Arc<dyn RoleStore>,
}

/// Shared application state.
pub struct AppState {
    /// Enabled OIDC providers.
    pub registry: ProviderRegistry,
    /// Session token issuer and verifier.
    pub issuer: JwtIssuer,
    /// Resolves provider logins to local users.
    pub linker: IdentityLinker,
    /// Email/password login and admin bootstrap.
    pub passwords: PasswordAuthService,
    /// Whether transient cookies carry the Secure flag.
    pub secure_cookies: bool,
}

impl AppState {
    /// Wires the authentication services together.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the token encryption key is
    /// unusable.
    pub fn new(
        config: &AuthConfig,
        registry: ProviderRegistry,
        stores: Stores,
    ) -> Result<Self, Report<AuthError>> {
        let cipher = TokenCipher::from_base64_key(config.token_encryption_key())?;
        let issuer = JwtIssuer::new(config);

        Ok(Self {
            registry,
            linker: IdentityLinker::new(stores.users.clone(), stores.identities, cipher),
            passwords: PasswordAuthService::new(
                stores.users,
                stores.roles,
                issuer.clone(),
                config.bcrypt_cost(),
            ),
            issuer,
            secure_cookies: config.secure_cookies(),
        })
    }
}

/// Builds the authentication router.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/auth/me", get(routes::me))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));

    Router::new()
        .route("/auth/{provider}/start", get(routes::start))
        .route("/auth/{provider}/callback", get(routes::callback))
        .route("/auth/{provider}/exchange", post(routes::exchange))
        .route("/auth/login", post(routes::login))
        .route("/auth/init-admin", post(routes::init_admin))
        .merge(protected)
        .with_state(state)
}
