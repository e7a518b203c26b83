//! The OIDC authorization-code flow.
//!
//! `begin` stores the per-login state, nonce and PKCE verifier in three
//! short-lived cookies and returns the provider URL. `complete` checks the
//! returned state against the cookie before anything else, consumes the
//! cookies and turns the code into a session token.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use time::Duration as TimeDuration;
use tollgate_identity::AuthError;
use tracing::{info, instrument};

use super::AppState;
use super::provider::{AuthRequest, IdentityProvider};
use crate::error::ApiError;

/// CSRF state cookie name.
pub const STATE_COOKIE: &str = "oidc_state";

/// ID token nonce cookie name.
pub const NONCE_COOKIE: &str = "oidc_nonce";

/// PKCE verifier cookie name.
pub const PKCE_COOKIE: &str = "oidc_pkce";

const TRANSIENT_COOKIES: [&str; 3] = [STATE_COOKIE, NONCE_COOKIE, PKCE_COOKIE];

fn transient_cookie(
    name: &'static str,
    value: String,
    secure: bool,
    max_age: TimeDuration,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

fn clear_transient(mut jar: CookieJar, secure: bool) -> CookieJar {
    for name in TRANSIENT_COOKIES {
        jar = jar.add(transient_cookie(name, String::new(), secure, TimeDuration::ZERO));
    }
    jar
}

/// Starts a login: sets the transient cookies and returns the provider's
/// authorization URL.
///
/// # Errors
///
/// Returns `UnknownProvider` if `provider` is not enabled.
#[instrument(skip(app, jar))]
pub fn begin(
    app: &AppState,
    provider: &str,
    jar: CookieJar,
) -> Result<(CookieJar, String), ApiError> {
    let provider = app.registry.get(provider)?;
    let request = AuthRequest::generate();
    let url = provider.authorization_url(&request);

    let secure = app.secure_cookies;
    let max_age = TimeDuration::minutes(10);
    let jar = jar
        .add(transient_cookie(STATE_COOKIE, request.state, secure, max_age))
        .add(transient_cookie(NONCE_COOKIE, request.nonce, secure, max_age))
        .add(transient_cookie(PKCE_COOKIE, request.pkce_verifier, secure, max_age));

    Ok((jar, url))
}

/// Finishes a login and returns a session token.
///
/// The returned jar is unchanged when the state check fails. Once the state
/// has matched, the jar always clears the transient cookies, whatever the
/// outcome of the exchange.
#[instrument(skip(app, code, state, jar))]
pub async fn complete(
    app: &AppState,
    provider: &str,
    code: Option<String>,
    state: Option<String>,
    jar: CookieJar,
) -> (CookieJar, Result<String, ApiError>) {
    let provider = match app.registry.get(provider) {
        Ok(provider) => provider,
        Err(e) => return (jar, Err(e.into())),
    };

    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
    let (Some(code), Some(state)) = (non_empty(code), non_empty(state)) else {
        let err = AuthError::Validation {
            details: "missing code or state".to_string(),
        };
        return (jar, Err(err.into()));
    };

    let cookie_value = |name: &str| jar.get(name).map(|c| c.value().to_string());
    if cookie_value(STATE_COOKIE).as_deref() != Some(state.as_str()) {
        return (jar, Err(AuthError::CsrfStateMismatch.into()));
    }
    let nonce = cookie_value(NONCE_COOKIE);
    let pkce_verifier = cookie_value(PKCE_COOKIE);

    let jar = clear_transient(jar, app.secure_cookies);

    let (Some(nonce), Some(pkce_verifier)) = (nonce, pkce_verifier) else {
        return (jar, Err(AuthError::CsrfStateMismatch.into()));
    };

    let request = AuthRequest {
        state,
        nonce,
        pkce_verifier,
    };
    let result = finish(app, provider, &code, &request).await;
    (jar, result)
}

async fn finish(
    app: &AppState,
    provider: Arc<dyn IdentityProvider>,
    code: &str,
    request: &AuthRequest,
) -> Result<String, ApiError> {
    let login = provider.exchange_code(code, request).await?;
    let linked = app
        .linker
        .upsert(provider.name(), &login.profile, &login.tokens)
        .await?;
    let token = app
        .issuer
        .issue(linked.user_id, linked.email.as_deref().unwrap_or_default())?;

    info!(provider = %provider.name(), user_id = %linked.user_id, "OIDC login succeeded");
    Ok(token)
}
