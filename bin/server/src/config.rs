//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested keys use
//! a double underscore, e.g. `AUTH__JWT_SECRET` or
//! `PROVIDERS__GOOGLE__CLIENT_ID`.
//!
//! See [`AuthConfig`] and [`ProvidersConfig`] for the authentication settings.

use rootcause::Report;
use serde::Deserialize;
use tollgate_identity::{AuthConfig, AuthError, ProvidersConfig};

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Session token, cookie and password settings.
    pub auth: AuthConfig,

    /// OIDC providers to enable. Providers without a section are disabled.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Checks values that deserialization accepts but the server cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` naming the offending setting.
    pub fn validate(&self) -> Result<(), Report<AuthError>> {
        if self.database_url.trim().is_empty() {
            return Err(AuthError::Configuration {
                details: "database_url must not be empty".to_string(),
            }
            .into());
        }
        self.auth.validate()?;
        self.providers.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_identity::ProviderName;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, config::ConfigError> {
        let source = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_environment(config::Environment::default().source(Some(source)))
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("DATABASE_URL", "postgres://localhost/tollgate"),
        ("AUTH__BASE_URL", "https://api.example.com"),
        ("AUTH__JWT_SECRET", "secret"),
        (
            "AUTH__TOKEN_ENCRYPTION_KEY",
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=",
        ),
    ];

    #[test]
    fn loads_required_keys_with_defaults() {
        let config = load(&REQUIRED).expect("load");
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.auth.access_ttl_minutes(), 15);
        assert!(config.auth.secure_cookies());
        assert!(config.providers.configured().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_overrides_and_provider_sections() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("AUTH__ACCESS_TTL_MINUTES", "30"),
            ("AUTH__SECURE_COOKIES", "false"),
            ("PROVIDERS__GOOGLE__ISSUER_URL", "https://accounts.google.com"),
            ("PROVIDERS__GOOGLE__CLIENT_ID", "client-id"),
            ("PROVIDERS__GOOGLE__CLIENT_SECRET", "client-secret"),
            ("PROVIDERS__GOOGLE__REDIRECT_PATH", "/auth/google/callback"),
        ]);
        let config = load(&vars).expect("load");

        assert_eq!(config.auth.access_ttl_minutes(), 30);
        assert!(!config.auth.secure_cookies());
        let configured = config.providers.configured();
        assert_eq!(configured.len(), 1);
        assert_eq!(configured[0].0, ProviderName::Google);
        assert_eq!(configured[0].1.client_id(), "client-id");
    }

    #[test]
    fn missing_jwt_secret_fails_to_load() {
        let vars: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "AUTH__JWT_SECRET")
            .collect();
        assert!(load(&vars).is_err());
    }
}
