//! The immutable set of providers enabled at startup.

use rootcause::Report;
use std::collections::HashMap;
use std::sync::Arc;
use tollgate_identity::{AuthConfig, AuthError, ProviderName, ProvidersConfig};
use tracing::info;

use super::oidc::OidcClient;
use super::provider::IdentityProvider;

/// Maps provider names to discovered clients.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderName, Arc<dyn IdentityProvider>>,
}

impl ProviderRegistry {
    /// Runs OIDC discovery for every configured provider.
    ///
    /// # Errors
    ///
    /// Fails on the first provider whose configuration is invalid or whose
    /// discovery document cannot be fetched.
    pub async fn discover(
        providers: &ProvidersConfig,
        auth: &AuthConfig,
    ) -> Result<Self, Report<AuthError>> {
        let mut registry = Self::default();
        for (name, config) in providers.configured() {
            let client = OidcClient::discover(name, config, auth).await?;
            info!(provider = %name, "OIDC provider discovered");
            registry.insert(Arc::new(client));
        }
        Ok(registry)
    }

    /// Builds a registry from already constructed providers.
    pub fn from_providers(providers: impl IntoIterator<Item = Arc<dyn IdentityProvider>>) -> Self {
        let mut registry = Self::default();
        for provider in providers {
            registry.insert(provider);
        }
        registry
    }

    fn insert(&mut self, provider: Arc<dyn IdentityProvider>) {
        self.providers.insert(provider.name(), provider);
    }

    /// Resolves a provider from its route segment.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownProvider` if the name is not supported or
    /// the provider is not configured.
    pub fn get(&self, name: &str) -> Result<Arc<dyn IdentityProvider>, AuthError> {
        let parsed: ProviderName = name.parse()?;
        self.providers
            .get(&parsed)
            .cloned()
            .ok_or_else(|| AuthError::UnknownProvider {
                name: name.to_string(),
            })
    }

    /// Returns the enabled provider names.
    pub fn names(&self) -> Vec<ProviderName> {
        let mut names: Vec<_> = self.providers.keys().copied().collect();
        names.sort_by_key(|n| n.as_str());
        names
    }
}
