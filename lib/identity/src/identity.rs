//! Federated identity records.
//!
//! An Identity binds one provider account, keyed by `(provider, subject)`, to
//! a local user. The provider's OAuth2 tokens are cached on it in sealed form
//! and refreshed on every login.

use chrono::{DateTime, Utc};
use tollgate_core::{IdentityId, UserId};

use crate::cipher::SealedToken;
use crate::provider::{ProviderName, ProviderProfile};

/// A provider account linked to a local user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    id: IdentityId,
    user_id: UserId,
    provider: ProviderName,
    /// The provider-scoped subject identifier. Never changes once linked.
    subject: String,
    email: Option<String>,
    name: Option<String>,
    avatar: Option<String>,
    access_token: Option<SealedToken>,
    refresh_token: Option<SealedToken>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Identity {
    /// Creates a new identity for `user_id` from a provider profile.
    #[must_use]
    pub fn new(user_id: UserId, provider: ProviderName, profile: &ProviderProfile) -> Self {
        let now = Utc::now();
        Self {
            id: IdentityId::new(),
            user_id,
            provider,
            subject: profile.subject.clone(),
            email: profile.email.clone(),
            name: profile.name.clone(),
            avatar: profile.picture.clone(),
            access_token: None,
            refresh_token: None,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitutes an identity from storage.
    #[must_use]
    #[expect(clippy::too_many_arguments)]
    pub fn with_all_fields(
        id: IdentityId,
        user_id: UserId,
        provider: ProviderName,
        subject: String,
        email: Option<String>,
        name: Option<String>,
        avatar: Option<String>,
        access_token: Option<SealedToken>,
        refresh_token: Option<SealedToken>,
        expires_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            provider,
            subject,
            email,
            name,
            avatar,
            access_token,
            refresh_token,
            expires_at,
            created_at,
            updated_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> IdentityId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn provider(&self) -> ProviderName {
        self.provider
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn avatar(&self) -> Option<&str> {
        self.avatar.as_deref()
    }

    /// Returns the sealed provider access token.
    #[must_use]
    pub fn access_token(&self) -> Option<&SealedToken> {
        self.access_token.as_ref()
    }

    /// Returns the sealed provider refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&SealedToken> {
        self.refresh_token.as_ref()
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Sets the sealed tokens while building a new identity.
    #[must_use]
    pub fn with_tokens(
        mut self,
        access_token: Option<SealedToken>,
        refresh_token: Option<SealedToken>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.access_token = access_token;
        self.refresh_token = refresh_token;
        self.expires_at = expires_at;
        self
    }

    /// Applies a fresh login.
    ///
    /// The profile mirror is always overwritten. Each cached token field is
    /// only replaced when this login supplied a value; providers commonly
    /// omit the refresh token on repeat consent.
    pub fn refresh(
        &mut self,
        profile: &ProviderProfile,
        access_token: Option<SealedToken>,
        refresh_token: Option<SealedToken>,
        expires_at: Option<DateTime<Utc>>,
    ) {
        self.email = profile.email.clone();
        self.name = profile.name.clone();
        self.avatar = profile.picture.clone();
        if access_token.is_some() {
            self.access_token = access_token;
        }
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        if expires_at.is_some() {
            self.expires_at = expires_at;
        }
        self.updated_at = Utc::now();
    }
}
