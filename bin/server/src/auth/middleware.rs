//! Bearer-token middleware and extractor for Axum.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tollgate_core::UserId;
use tollgate_identity::AuthError;

use super::AppState;
use crate::error::ApiError;

/// The caller identity taken from a verified session token.
///
/// The token is trusted for the lifetime of the request; the user is not
/// re-read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
    pub email: String,
}

/// Rejects requests without a valid `Authorization: Bearer` session token
/// and stores the [`AuthContext`] in the request extensions.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    let claims = state.issuer.verify_bearer(header)?;
    let user_id = claims.user_id().map_err(|_| AuthError::InvalidToken)?;

    request.extensions_mut().insert(AuthContext {
        user_id,
        email: claims.email,
    });
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| AuthError::MissingBearerToken.into())
    }
}
