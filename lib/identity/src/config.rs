//! Authentication configuration.
//!
//! These types are deserialized by the server from environment variables and
//! then handed by reference to every component that needs them. Nothing in
//! this crate reads the process environment itself.

use crate::error::AuthError;
use crate::provider::ProviderName;
use rootcause::Report;
use serde::{Deserialize, Serialize};

/// Global authentication settings.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Public base URL of this service (e.g., "https://api.example.com").
    /// Provider redirect paths are appended to it.
    base_url: String,
    /// Shared HMAC secret used to sign session tokens.
    jwt_secret: String,
    /// Session token lifetime in minutes.
    /// Default: 15
    #[serde(default = "default_access_ttl_minutes")]
    access_ttl_minutes: i64,
    /// Base64-encoded 32-byte key sealing cached provider tokens.
    token_encryption_key: String,
    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    secure_cookies: bool,
    /// bcrypt work factor for new password hashes.
    #[serde(default = "default_bcrypt_cost")]
    bcrypt_cost: u32,
}

/// Lowest work factor bcrypt accepts.
const MIN_BCRYPT_COST: u32 = 4;

/// Highest work factor bcrypt accepts.
const MAX_BCRYPT_COST: u32 = 31;

/// Longest session token lifetime: 7 days.
const MAX_ACCESS_TTL_MINUTES: i64 = 7 * 24 * 60;

fn default_access_ttl_minutes() -> i64 {
    15
}

fn default_secure_cookies() -> bool {
    true
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

impl AuthConfig {
    /// Creates a configuration with defaults for optional fields.
    #[must_use]
    pub fn new(base_url: String, jwt_secret: String, token_encryption_key: String) -> Self {
        Self {
            base_url,
            jwt_secret,
            access_ttl_minutes: default_access_ttl_minutes(),
            token_encryption_key,
            secure_cookies: default_secure_cookies(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }

    /// Sets the session token lifetime.
    #[must_use]
    pub fn with_access_ttl_minutes(mut self, minutes: i64) -> Self {
        self.access_ttl_minutes = minutes;
        self
    }

    /// Sets whether cookies carry the Secure flag.
    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Sets the bcrypt work factor.
    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Returns the public base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the session token signing secret.
    #[must_use]
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    /// Returns the session token lifetime in minutes.
    #[must_use]
    pub fn access_ttl_minutes(&self) -> i64 {
        self.access_ttl_minutes
    }

    /// Returns the base64-encoded token sealing key.
    #[must_use]
    pub fn token_encryption_key(&self) -> &str {
        &self.token_encryption_key
    }

    /// Returns whether cookies carry the Secure flag.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    /// Returns the bcrypt work factor.
    #[must_use]
    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }

    /// Checks values that serde cannot reject on its own.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` naming the offending setting.
    pub fn validate(&self) -> Result<(), Report<AuthError>> {
        if self.base_url.trim().is_empty() {
            return Err(configuration("auth.base_url must not be empty"));
        }
        if self.jwt_secret.is_empty() {
            return Err(configuration("auth.jwt_secret must not be empty"));
        }
        if self.access_ttl_minutes <= 0 {
            return Err(configuration("auth.access_ttl_minutes must be positive"));
        }
        if self.access_ttl_minutes > MAX_ACCESS_TTL_MINUTES {
            return Err(configuration("auth.access_ttl_minutes must be at most 7 days"));
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(configuration("auth.bcrypt_cost is out of range"));
        }
        Ok(())
    }
}

/// Configuration for one OIDC identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// The OIDC issuer URL used for discovery
    /// (e.g., "https://accounts.google.com").
    issuer_url: String,
    /// The OAuth2 client ID registered with the provider.
    client_id: String,
    /// The OAuth2 client secret.
    client_secret: String,
    /// Callback path appended to the base URL (e.g., "/auth/google/callback").
    redirect_path: String,
    /// OAuth2 scopes to request as a comma-separated string.
    /// Default: "openid,email,profile"
    #[serde(default = "default_scopes")]
    scopes: String,
}

fn default_scopes() -> String {
    "openid,email,profile".to_string()
}

impl ProviderConfig {
    /// Creates a provider configuration with the default scopes.
    #[must_use]
    pub fn new(
        issuer_url: String,
        client_id: String,
        client_secret: String,
        redirect_path: String,
    ) -> Self {
        Self {
            issuer_url,
            client_id,
            client_secret,
            redirect_path,
            scopes: default_scopes(),
        }
    }

    /// Returns the OIDC issuer URL.
    #[must_use]
    pub fn issuer_url(&self) -> &str {
        &self.issuer_url
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth2 client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns the callback path.
    #[must_use]
    pub fn redirect_path(&self) -> &str {
        &self.redirect_path
    }

    /// Returns the scopes to request. `openid` is always included.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        let mut scopes: Vec<&str> = self
            .scopes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if !scopes.contains(&"openid") {
            scopes.insert(0, "openid");
        }
        scopes
    }

    /// Joins the base URL and the callback path into the redirect URL.
    #[must_use]
    pub fn redirect_url(&self, base_url: &str) -> String {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.redirect_path.trim_start_matches('/')
        )
    }

    fn validate(&self, provider: ProviderName) -> Result<(), Report<AuthError>> {
        for (field, value) in [
            ("issuer_url", &self.issuer_url),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_path", &self.redirect_path),
        ] {
            if value.trim().is_empty() {
                return Err(configuration(&format!(
                    "providers.{provider}.{field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// The set of configured providers.
///
/// A provider is enabled by supplying its section; a supplied section with a
/// missing field fails deserialization at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Google sign-in.
    #[serde(default)]
    pub google: Option<ProviderConfig>,
    /// LINE login.
    #[serde(default)]
    pub line: Option<ProviderConfig>,
}

impl ProvidersConfig {
    /// Returns the configured providers in a stable order.
    #[must_use]
    pub fn configured(&self) -> Vec<(ProviderName, &ProviderConfig)> {
        ProviderName::ALL
            .iter()
            .filter_map(|name| self.get(*name).map(|config| (*name, config)))
            .collect()
    }

    /// Returns the configuration for one provider, if present.
    #[must_use]
    pub fn get(&self, name: ProviderName) -> Option<&ProviderConfig> {
        match name {
            ProviderName::Google => self.google.as_ref(),
            ProviderName::Line => self.line.as_ref(),
        }
    }

    /// Checks every configured provider for empty required fields.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` for the first empty field.
    pub fn validate(&self) -> Result<(), Report<AuthError>> {
        for (name, config) in self.configured() {
            config.validate(name)?;
        }
        Ok(())
    }
}

fn configuration(details: &str) -> Report<AuthError> {
    AuthError::Configuration {
        details: details.to_string(),
    }
    .into()
}
