//! The seam between the login flow and a concrete identity provider.

use async_trait::async_trait;
use openidconnect::{CsrfToken, Nonce, PkceCodeChallenge, PkceCodeVerifier};
use rootcause::Report;
use tollgate_identity::{AuthError, ProviderName, ProviderProfile, ProviderTokens};

/// Per-login random values, generated at start and echoed back through
/// cookies at completion.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub state: String,
    pub nonce: String,
    pub pkce_verifier: String,
}

impl AuthRequest {
    /// Generates fresh state, nonce and PKCE verifier.
    pub fn generate() -> Self {
        let (_, verifier) = PkceCodeChallenge::new_random_sha256();
        Self {
            state: CsrfToken::new_random().secret().clone(),
            nonce: Nonce::new_random().secret().clone(),
            pkce_verifier: verifier.secret().clone(),
        }
    }

    /// Derives the S256 code challenge sent with the authorization request.
    pub fn pkce_challenge(&self) -> PkceCodeChallenge {
        PkceCodeChallenge::from_code_verifier_sha256(&PkceCodeVerifier::new(
            self.pkce_verifier.clone(),
        ))
    }
}

impl std::fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRequest").finish_non_exhaustive()
    }
}

/// What a provider hands back after a successful code exchange.
#[derive(Debug, Clone)]
pub struct ProviderLogin {
    pub profile: ProviderProfile,
    pub tokens: ProviderTokens,
}

/// An OIDC identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The provider this client talks to.
    fn name(&self) -> ProviderName;

    /// Builds the URL the browser is redirected to.
    fn authorization_url(&self, request: &AuthRequest) -> String;

    /// Exchanges an authorization code and verifies the returned ID token,
    /// including its nonce.
    async fn exchange_code(
        &self,
        code: &str,
        request: &AuthRequest,
    ) -> Result<ProviderLogin, Report<AuthError>>;
}
