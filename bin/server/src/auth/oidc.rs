//! OIDC client implementation using the openidconnect crate.

use async_trait::async_trait;
use chrono::Utc;
use openidconnect::core::{
    CoreAuthenticationFlow, CoreClient, CoreJwsSigningAlgorithm, CoreProviderMetadata,
};
use openidconnect::{
    AuthorizationCode, ClientId, ClientSecret, CsrfToken, IssuerUrl, Nonce, OAuth2TokenResponse,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse,
};
use rootcause::Report;
use std::time::Duration;
use tollgate_identity::{
    AuthConfig, AuthError, ProviderConfig, ProviderName, ProviderProfile, ProviderTokens,
};
use tracing::{debug, instrument};

use super::provider::{AuthRequest, IdentityProvider, ProviderLogin};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// OIDC client for one discovered provider.
pub struct OidcClient {
    name: ProviderName,
    provider_metadata: CoreProviderMetadata,
    client_id: ClientId,
    client_secret: ClientSecret,
    redirect_url: RedirectUrl,
    scopes: Vec<Scope>,
    http_client: reqwest::Client,
}

impl OidcClient {
    /// Creates a client by discovering the provider metadata.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` for malformed URLs and
    /// `AuthError::Discovery` if the discovery document cannot be fetched.
    #[instrument(skip(config, auth), fields(issuer = %config.issuer_url()))]
    pub async fn discover(
        name: ProviderName,
        config: &ProviderConfig,
        auth: &AuthConfig,
    ) -> Result<Self, Report<AuthError>> {
        let issuer_url = IssuerUrl::new(config.issuer_url().to_string()).map_err(|e| {
            AuthError::Configuration {
                details: format!("providers.{name}.issuer_url is invalid: {e}"),
            }
        })?;

        let redirect_url =
            RedirectUrl::new(config.redirect_url(auth.base_url())).map_err(|e| {
                AuthError::Configuration {
                    details: format!("redirect URL for '{name}' is invalid: {e}"),
                }
            })?;

        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Configuration {
                details: format!("failed to create HTTP client: {e}"),
            })?;

        let provider_metadata = CoreProviderMetadata::discover_async(issuer_url, &http_client)
            .await
            .map_err(|e| AuthError::Discovery {
                provider: name.to_string(),
                details: e.to_string(),
            })?;

        // `openid` is added by the authentication flow itself.
        let scopes = config
            .scopes()
            .into_iter()
            .filter(|s| *s != "openid")
            .map(|s| Scope::new(s.to_string()))
            .collect();

        Ok(Self {
            name,
            provider_metadata,
            client_id: ClientId::new(config.client_id().to_string()),
            client_secret: ClientSecret::new(config.client_secret().to_string()),
            redirect_url,
            scopes,
            http_client,
        })
    }

    fn token_exchange(&self, details: String) -> AuthError {
        AuthError::TokenExchange {
            provider: self.name.to_string(),
            details,
        }
    }
}

#[async_trait]
impl IdentityProvider for OidcClient {
    fn name(&self) -> ProviderName {
        self.name
    }

    fn authorization_url(&self, request: &AuthRequest) -> String {
        let state = request.state.clone();
        let nonce = request.nonce.clone();

        let client = CoreClient::from_provider_metadata(
            self.provider_metadata.clone(),
            self.client_id.clone(),
            Some(self.client_secret.clone()),
        )
        .set_redirect_uri(self.redirect_url.clone());

        let mut auth_request = client
            .authorize_url(
                CoreAuthenticationFlow::AuthorizationCode,
                move || CsrfToken::new(state),
                move || Nonce::new(nonce),
            )
            .set_pkce_challenge(request.pkce_challenge());

        for scope in &self.scopes {
            auth_request = auth_request.add_scope(scope.clone());
        }

        let (auth_url, _, _) = auth_request.url();
        auth_url.to_string()
    }

    #[instrument(skip_all, fields(provider = %self.name))]
    async fn exchange_code(
        &self,
        code: &str,
        request: &AuthRequest,
    ) -> Result<ProviderLogin, Report<AuthError>> {
        let client = CoreClient::from_provider_metadata(
            self.provider_metadata.clone(),
            self.client_id.clone(),
            Some(self.client_secret.clone()),
        )
        .set_redirect_uri(self.redirect_url.clone());

        let token_request = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .map_err(|e| self.token_exchange(format!("token endpoint error: {e}")))?;

        let token_response = token_request
            .set_pkce_verifier(PkceCodeVerifier::new(request.pkce_verifier.clone()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| self.token_exchange(format!("token exchange failed: {e}")))?;

        let id_token = token_response.id_token().ok_or(AuthError::MissingIdToken)?;

        // LINE signs ID tokens with ES256 or with the channel secret (HS256).
        let verifier = client.id_token_verifier().set_allowed_algs(vec![
            CoreJwsSigningAlgorithm::RsaSsaPkcs1V15Sha256,
            CoreJwsSigningAlgorithm::EcdsaP256Sha256,
            CoreJwsSigningAlgorithm::HmacSha256,
        ]);
        let nonce = Nonce::new(request.nonce.clone());
        let claims = id_token
            .claims(&verifier, &nonce)
            .map_err(|e| AuthError::InvalidIdToken {
                details: e.to_string(),
            })?;

        let profile = ProviderProfile::new(claims.subject().as_str())
            .with_email(claims.email().map(|e| e.as_str().to_string()))
            .with_email_verified(claims.email_verified())
            .with_name(
                claims
                    .name()
                    .and_then(|n| n.get(None))
                    .map(|n| n.as_str().to_string()),
            )
            .with_picture(
                claims
                    .picture()
                    .and_then(|p| p.get(None))
                    .map(|p| p.as_str().to_string()),
            );

        let expires_at = token_response
            .expires_in()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| Utc::now() + d);

        let tokens = ProviderTokens {
            access_token: Some(token_response.access_token().secret().clone()),
            refresh_token: token_response.refresh_token().map(|t| t.secret().clone()),
            expires_at,
        };

        debug!(subject = %profile.subject, "ID token verified");
        Ok(ProviderLogin { profile, tokens })
    }
}
