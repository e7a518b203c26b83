//! Authentication routes.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tollgate_identity::{AuthError, User};
use validator::Validate;

use super::{AppState, flow, middleware::AuthContext};
use crate::error::ApiError;

/// Query parameters for the OIDC callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    /// Set by the provider when the user denied consent.
    error: Option<String>,
}

/// Body of the code exchange endpoint used by mobile clients.
#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    code: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 8))]
    password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct InitAdminRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 8))]
    password: String,
    #[validate(length(min = 2))]
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserBody {
    id: String,
    email: Option<String>,
    name: Option<String>,
    role: String,
}

impl UserBody {
    fn new(user: &User, role: Option<&str>) -> Self {
        Self {
            id: user.id().to_string(),
            email: user.email().map(str::to_string),
            name: user.name().map(str::to_string),
            role: role.unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    access_token: String,
    user: UserBody,
}

#[derive(Debug, Serialize)]
pub struct InitAdminResponse {
    user: UserBody,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    id: String,
    email: String,
}

/// Parses and validates a JSON body, turning both kinds of failure into a
/// 400 response.
fn validated<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError>
where
    T: DeserializeOwned + Validate,
{
    let Json(value) = body.map_err(|e| AuthError::Validation {
        details: e.body_text(),
    })?;
    value.validate().map_err(|e| AuthError::Validation {
        details: e.to_string(),
    })?;
    Ok(value)
}

/// `GET /auth/{provider}/start`: redirects to the provider's login page.
pub async fn start(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    let (jar, url) = flow::begin(&state, &provider, jar)?;
    Ok((jar, Redirect::temporary(&url)))
}

/// `GET /auth/{provider}/callback`: completes the login in the browser.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> impl IntoResponse {
    if let Some(error) = &query.error {
        tracing::info!(provider = %provider, error = %error, "provider returned an error");
    }
    let (jar, result) = flow::complete(&state, &provider, query.code, query.state, jar).await;
    (jar, result.map(|access_token| Json(TokenResponse { access_token })))
}

/// `POST /auth/{provider}/exchange`: completes a login whose code was
/// delivered to a native client.
pub async fn exchange(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    jar: CookieJar,
    body: Result<Json<ExchangeRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match body {
        Ok(Json(request)) => request,
        Err(e) => {
            let err = ApiError::from(AuthError::Validation {
                details: e.body_text(),
            });
            return (jar, Err::<Json<TokenResponse>, _>(err));
        }
    };
    let (jar, result) = flow::complete(&state, &provider, request.code, request.state, jar).await;
    (jar, result.map(|access_token| Json(TokenResponse { access_token })))
}

/// `POST /auth/login`: email/password login.
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let request = validated(body)?;
    let login = state
        .passwords
        .login(&request.email, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        access_token: login.token,
        user: UserBody::new(&login.user, login.role.as_deref()),
    }))
}

/// `POST /auth/init-admin`: bootstraps the first administrator.
pub async fn init_admin(
    State(state): State<Arc<AppState>>,
    body: Result<Json<InitAdminRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<InitAdminResponse>), ApiError> {
    let request = validated(body)?;
    let admin = state
        .passwords
        .init_admin(&request.email, &request.password, &request.name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(InitAdminResponse {
            user: UserBody::new(&admin.user, Some(admin.role.name())),
        }),
    ))
}

/// `GET /auth/me`: echoes the identity carried by the bearer token.
pub async fn me(auth: AuthContext) -> Json<MeResponse> {
    Json(MeResponse {
        id: auth.user_id.to_string(),
        email: auth.email,
    })
}
