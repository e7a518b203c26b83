//! Supported identity providers and the data they hand back after login.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AuthError;

/// The closed set of OIDC providers this service can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    /// Google sign-in.
    Google,
    /// LINE login.
    Line,
}

impl ProviderName {
    /// Every supported provider.
    pub const ALL: [ProviderName; 2] = [ProviderName::Google, ProviderName::Line];

    /// Returns the identifier used in routes and in the `identities.provider` column.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Line => "line",
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Self::Google),
            "line" => Ok(Self::Line),
            other => Err(AuthError::UnknownProvider {
                name: other.to_string(),
            }),
        }
    }
}

/// Profile claims taken from a verified ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// The provider-scoped subject identifier.
    pub subject: String,
    /// Email address, if the provider shared one.
    pub email: Option<String>,
    /// The provider's `email_verified` claim, if present.
    pub email_verified: Option<bool>,
    /// Display name.
    pub name: Option<String>,
    /// Avatar URL.
    pub picture: Option<String>,
}

impl ProviderProfile {
    /// Creates a profile with only the subject set.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            email: None,
            email_verified: None,
            name: None,
            picture: None,
        }
    }

    /// Sets the email claim.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    /// Sets the `email_verified` claim.
    #[must_use]
    pub fn with_email_verified(mut self, verified: Option<bool>) -> Self {
        self.email_verified = verified;
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Sets the avatar URL.
    #[must_use]
    pub fn with_picture(mut self, picture: Option<String>) -> Self {
        self.picture = picture;
        self
    }

    /// Returns the email if it may be used to find or create a local account.
    ///
    /// An email the provider explicitly marks as unverified is never used for
    /// account linking; LINE omits the claim entirely, which is accepted.
    #[must_use]
    pub fn linkable_email(&self) -> Option<&str> {
        match self.email_verified {
            Some(false) => None,
            _ => self.email.as_deref().filter(|e| !e.is_empty()),
        }
    }
}

/// OAuth2 tokens returned by the provider's token endpoint.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderTokens {
    /// Access token for the provider's APIs.
    pub access_token: Option<String>,
    /// Refresh token, when the provider issued one.
    pub refresh_token: Option<String>,
    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for ProviderTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderTokens")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
