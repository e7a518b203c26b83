//! Router tests driven through a fake identity provider.

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{
        Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
    response::Response,
};
use rootcause::Report;
use std::sync::{Arc, Mutex};
use tollgate_identity::memory::MemoryStore;
use tollgate_identity::{
    AuthConfig, AuthError, ProviderName, ProviderProfile, ProviderTokens, UserStore,
};
use tower::ServiceExt;

use super::{AppState, AuthRequest, IdentityProvider, ProviderLogin, ProviderRegistry, Stores};

const KEY: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

/// Stands in for an OIDC provider. Remembers the nonce it was sent at
/// authorization time and rejects exchanges carrying a different one, as a
/// real ID token verification would.
struct FakeProvider {
    profile: ProviderProfile,
    issued_nonces: Mutex<Vec<String>>,
}

impl FakeProvider {
    fn new(profile: ProviderProfile) -> Self {
        Self {
            profile,
            issued_nonces: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn name(&self) -> ProviderName {
        ProviderName::Google
    }

    fn authorization_url(&self, request: &AuthRequest) -> String {
        self.issued_nonces
            .lock()
            .expect("lock")
            .push(request.nonce.clone());
        format!(
            "https://idp.example.com/authorize?state={}&code_challenge={}",
            request.state,
            request.pkce_challenge().as_str()
        )
    }

    async fn exchange_code(
        &self,
        code: &str,
        request: &AuthRequest,
    ) -> Result<ProviderLogin, Report<AuthError>> {
        match code {
            "rejected" => {
                return Err(AuthError::TokenExchange {
                    provider: "google".to_string(),
                    details: "invalid_grant".to_string(),
                }
                .into());
            }
            "no-id-token" => return Err(AuthError::MissingIdToken.into()),
            _ => {}
        }
        let nonce_known = self
            .issued_nonces
            .lock()
            .expect("lock")
            .contains(&request.nonce);
        if !nonce_known {
            return Err(AuthError::InvalidIdToken {
                details: "nonce mismatch".to_string(),
            }
            .into());
        }
        Ok(ProviderLogin {
            profile: self.profile.clone(),
            tokens: ProviderTokens {
                access_token: Some("provider-access".to_string()),
                refresh_token: None,
                expires_at: None,
            },
        })
    }
}

struct Harness {
    app: Router,
    store: Arc<MemoryStore>,
    state: Arc<AppState>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let config = AuthConfig::new(
        "https://api.example.com".to_string(),
        "test-secret".to_string(),
        KEY.to_string(),
    )
    .with_bcrypt_cost(4);
    let provider: Arc<dyn IdentityProvider> = Arc::new(FakeProvider::new(
        ProviderProfile::new("google-sub-1")
            .with_email(Some("a@x.com".to_string()))
            .with_email_verified(Some(true)),
    ));
    let stores = Stores {
        users: store.clone(),
        identities: store.clone(),
        roles: store.clone(),
    };
    let state = Arc::new(
        AppState::new(&config, ProviderRegistry::from_providers([provider]), stores)
            .expect("state"),
    );
    Harness {
        app: super::router(state.clone()),
        store,
        state,
    }
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.expect("infallible")
}

async fn json_body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("request")
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// Returns `name=value` pairs from the response's Set-Cookie headers.
fn set_cookies(response: &Response) -> Vec<(String, String, String)> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|raw| {
            let (pair, attrs) = raw.split_once(';').unwrap_or((raw, ""));
            let (name, value) = pair.split_once('=')?;
            Some((name.to_string(), value.to_string(), attrs.to_string()))
        })
        .collect()
}

fn cookie_value(response: &Response, name: &str) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|(n, _, _)| n == name)
        .map(|(_, v, _)| v)
}

/// Runs `start` and returns the cookie header a browser would send back,
/// together with the state value.
async fn start_login(app: &Router) -> (String, String) {
    let response = send(app, get("/auth/google/start", None)).await;
    let state = cookie_value(&response, "oidc_state").expect("state cookie");
    let nonce = cookie_value(&response, "oidc_nonce").expect("nonce cookie");
    let pkce = cookie_value(&response, "oidc_pkce").expect("pkce cookie");
    (
        format!("oidc_state={state}; oidc_nonce={nonce}; oidc_pkce={pkce}"),
        state,
    )
}

#[tokio::test]
async fn start_redirects_and_sets_transient_cookies() {
    let h = harness();
    let response = send(&h.app, get("/auth/google/start", None)).await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("location");
    let state = cookie_value(&response, "oidc_state").expect("state cookie");
    assert!(location.contains(&format!("state={state}")));
    assert!(location.contains("code_challenge="));

    for (name, _, attrs) in set_cookies(&response) {
        assert!(name.starts_with("oidc_"));
        assert!(attrs.contains("HttpOnly"), "{name}: {attrs}");
        assert!(attrs.contains("SameSite=Lax"), "{name}: {attrs}");
        assert!(attrs.contains("Path=/"), "{name}: {attrs}");
        assert!(attrs.contains("Secure"), "{name}: {attrs}");
    }
}

#[tokio::test]
async fn consecutive_starts_use_fresh_values() {
    let h = harness();
    let first = send(&h.app, get("/auth/google/start", None)).await;
    let second = send(&h.app, get("/auth/google/start", None)).await;

    assert_ne!(
        cookie_value(&first, "oidc_state"),
        cookie_value(&second, "oidc_state")
    );
    assert_ne!(
        cookie_value(&first, "oidc_nonce"),
        cookie_value(&second, "oidc_nonce")
    );
}

#[tokio::test]
async fn unknown_or_unconfigured_provider_is_bad_request() {
    let h = harness();
    for uri in ["/auth/facebook/start", "/auth/line/start"] {
        let response = send(&h.app, get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json_body(response).await["message"], "unknown provider");
    }
}

#[tokio::test]
async fn callback_issues_session_token_and_clears_cookies() {
    let h = harness();
    let (cookies, state) = start_login(&h.app).await;

    let response = send(
        &h.app,
        get(
            &format!("/auth/google/callback?code=good&state={state}"),
            Some(&cookies),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    for name in ["oidc_state", "oidc_nonce", "oidc_pkce"] {
        assert_eq!(cookie_value(&response, name).as_deref(), Some(""), "{name}");
    }

    let body = json_body(response).await;
    let token = body["accessToken"].as_str().expect("token");
    let claims = h.state.issuer.verify(token).expect("valid token");
    assert_eq!(claims.email, "a@x.com");
    assert_eq!(h.store.user_count(), 1);
}

#[tokio::test]
async fn state_mismatch_is_unauthorized_and_keeps_cookies() {
    let h = harness();
    let (cookies, _) = start_login(&h.app).await;

    let response = send(
        &h.app,
        get("/auth/google/callback?code=good&state=forged", Some(&cookies)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
    assert_eq!(json_body(response).await["message"], "invalid state");
    assert_eq!(h.store.user_count(), 0);
}

#[tokio::test]
async fn missing_state_cookie_is_unauthorized() {
    let h = harness();
    let response = send(&h.app, get("/auth/google/callback?code=good&state=abc", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_code_is_bad_request() {
    let h = harness();
    let (cookies, state) = start_login(&h.app).await;
    let response = send(
        &h.app,
        get(&format!("/auth/google/callback?state={state}"), Some(&cookies)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Completes a login whose state matches but whose cookie header is
/// otherwise given by `cookies`.
async fn callback_with_cookies(app: &Router, state: &str, cookies: &str) -> Response {
    send(
        app,
        get(
            &format!("/auth/google/callback?code=good&state={state}"),
            Some(cookies),
        ),
    )
    .await
}

#[tokio::test]
async fn missing_nonce_cookie_is_unauthorized_and_clears_cookies() {
    let h = harness();
    let (_, state) = start_login(&h.app).await;
    let cookies = format!("oidc_state={state}; oidc_pkce=verifier");

    let response = callback_with_cookies(&h.app, &state, &cookies).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    for name in ["oidc_state", "oidc_nonce", "oidc_pkce"] {
        assert_eq!(cookie_value(&response, name).as_deref(), Some(""), "{name}");
    }
    assert_eq!(json_body(response).await["message"], "invalid state");
    assert_eq!(h.store.user_count(), 0);
}

#[tokio::test]
async fn missing_pkce_cookie_is_unauthorized_and_clears_cookies() {
    let h = harness();
    let (_, state) = start_login(&h.app).await;
    let cookies = format!("oidc_state={state}; oidc_nonce=nonce");

    let response = callback_with_cookies(&h.app, &state, &cookies).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    for name in ["oidc_state", "oidc_nonce", "oidc_pkce"] {
        assert_eq!(cookie_value(&response, name).as_deref(), Some(""), "{name}");
    }
    assert_eq!(json_body(response).await["message"], "invalid state");
    assert_eq!(h.store.user_count(), 0);
}

#[tokio::test]
async fn nonce_from_another_login_is_rejected() {
    let h = harness();
    let (_, state) = start_login(&h.app).await;
    let cookies = format!("oidc_state={state}; oidc_nonce=replayed; oidc_pkce=verifier");

    let response = send(
        &h.app,
        get(
            &format!("/auth/google/callback?code=good&state={state}"),
            Some(&cookies),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(cookie_value(&response, "oidc_state").as_deref(), Some(""));
    assert_eq!(json_body(response).await["message"], "authentication failed");
}

#[tokio::test]
async fn provider_failures_are_unauthorized() {
    let h = harness();
    for code in ["rejected", "no-id-token"] {
        let (cookies, state) = start_login(&h.app).await;
        let response = send(
            &h.app,
            get(
                &format!("/auth/google/callback?code={code}&state={state}"),
                Some(&cookies),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{code}");
    }
}

#[tokio::test]
async fn exchange_endpoint_completes_login() {
    let h = harness();
    let (cookies, state) = start_login(&h.app).await;

    let mut request = post_json(
        "/auth/google/exchange",
        serde_json::json!({ "code": "good", "state": state }),
    );
    request
        .headers_mut()
        .insert(COOKIE, cookies.parse().expect("header"));
    let response = send(&h.app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(json_body(response).await["accessToken"].is_string());
}

#[tokio::test]
async fn exchange_with_malformed_body_is_bad_request() {
    let h = harness();
    let request = Request::builder()
        .method("POST")
        .uri("/auth/google/exchange")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let response = send(&h.app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn init_admin_then_login_then_me() {
    let h = harness();
    let admin = serde_json::json!({
        "email": "root@x.com",
        "password": "hunter22",
        "name": "Root",
    });

    let created = send(&h.app, post_json("/auth/init-admin", admin.clone())).await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = json_body(created).await;
    assert_eq!(body["user"]["role"], "admin");
    assert_eq!(body["user"]["email"], "root@x.com");

    let again = send(&h.app, post_json("/auth/init-admin", admin)).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let login = send(
        &h.app,
        post_json(
            "/auth/login",
            serde_json::json!({ "email": "root@x.com", "password": "hunter22" }),
        ),
    )
    .await;
    assert_eq!(login.status(), StatusCode::OK);
    let body = json_body(login).await;
    assert_eq!(body["user"]["role"], "admin");
    let token = body["accessToken"].as_str().expect("token").to_string();

    let me = Request::builder()
        .uri("/auth/me")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request");
    let response = send(&h.app, me).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["email"], "root@x.com");
}

#[tokio::test]
async fn bad_credentials_are_indistinguishable() {
    let h = harness();
    send(
        &h.app,
        post_json(
            "/auth/init-admin",
            serde_json::json!({ "email": "root@x.com", "password": "hunter22", "name": "Root" }),
        ),
    )
    .await;

    let wrong = send(
        &h.app,
        post_json(
            "/auth/login",
            serde_json::json!({ "email": "root@x.com", "password": "wrong-pass" }),
        ),
    )
    .await;
    let unknown = send(
        &h.app,
        post_json(
            "/auth/login",
            serde_json::json!({ "email": "nobody@x.com", "password": "hunter22" }),
        ),
    )
    .await;

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(wrong).await, json_body(unknown).await);
}

#[tokio::test]
async fn login_validation_errors_are_bad_request() {
    let h = harness();
    for body in [
        serde_json::json!({ "email": "not-an-email", "password": "hunter22" }),
        serde_json::json!({ "email": "a@x.com", "password": "short" }),
        serde_json::json!({ "email": "a@x.com" }),
    ] {
        let response = send(&h.app, post_json("/auth/login", body.clone())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
    }
}

#[tokio::test]
async fn init_admin_requires_a_name() {
    let h = harness();
    let response = send(
        &h.app,
        post_json(
            "/auth/init-admin",
            serde_json::json!({ "email": "root@x.com", "password": "hunter22", "name": "R" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn me_requires_a_valid_bearer_token() {
    let h = harness();

    let missing = send(&h.app, get("/auth/me", None)).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(missing).await["message"], "missing bearer token");

    let forged = Request::builder()
        .uri("/auth/me")
        .header(AUTHORIZATION, "Bearer not.a.token")
        .body(Body::empty())
        .expect("request");
    let response = send(&h.app, forged).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["message"], "invalid token");
}

#[tokio::test]
async fn oidc_login_links_to_existing_password_user() {
    let h = harness();
    let existing = tollgate_identity::User::new(Some("a@x.com".to_string()), None);
    UserStore::create(h.store.as_ref(), &existing)
        .await
        .expect("seed");

    let (cookies, state) = start_login(&h.app).await;
    let response = send(
        &h.app,
        get(
            &format!("/auth/google/callback?code=good&state={state}"),
            Some(&cookies),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let claims = h
        .state
        .issuer
        .verify(body["accessToken"].as_str().expect("token"))
        .expect("valid token");
    assert_eq!(claims.user_id().expect("uuid"), existing.id());
    assert_eq!(h.store.user_count(), 1);
}
