//! Resolves a verified provider login to a local user.

use rootcause::Report;
use std::sync::Arc;
use tollgate_core::UserId;
use tracing::{debug, info, instrument, warn};

use crate::cipher::TokenCipher;
use crate::error::{AuthError, StoreError};
use crate::identity::Identity;
use crate::provider::{ProviderName, ProviderProfile, ProviderTokens};
use crate::store::{IdentityStore, UserStore};
use crate::user::User;

/// The local user a login resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedUser {
    pub user_id: UserId,
    pub email: Option<String>,
}

/// Outcome of one resolution attempt that did not succeed.
enum AttemptError {
    /// A unique constraint fired; a concurrent login got there first.
    Conflict(StoreError),
    Failed(Report<AuthError>),
}

impl From<Report<AuthError>> for AttemptError {
    fn from(report: Report<AuthError>) -> Self {
        Self::Failed(report)
    }
}

impl From<AuthError> for AttemptError {
    fn from(err: AuthError) -> Self {
        Self::Failed(err.into())
    }
}

/// Finds or creates the user and identity for a provider login.
#[derive(Clone)]
pub struct IdentityLinker {
    users: Arc<dyn UserStore>,
    identities: Arc<dyn IdentityStore>,
    cipher: TokenCipher,
}

impl IdentityLinker {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        identities: Arc<dyn IdentityStore>,
        cipher: TokenCipher,
    ) -> Self {
        Self {
            users,
            identities,
            cipher,
        }
    }

    /// Resolves a login, in order: known identity, user with the same
    /// usable email, or a brand new user.
    ///
    /// A lost insert race is retried once, which then finds the row the
    /// other login wrote.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::IdentityConflict` if the retry conflicts as well,
    /// `AuthError::Storage` on backend failure and `AuthError::Cipher` if the
    /// provider tokens cannot be sealed.
    #[instrument(skip(self, profile, tokens), fields(provider = %provider))]
    pub async fn upsert(
        &self,
        provider: ProviderName,
        profile: &ProviderProfile,
        tokens: &ProviderTokens,
    ) -> Result<LinkedUser, Report<AuthError>> {
        match self.attempt(provider, profile, tokens).await {
            Ok(linked) => Ok(linked),
            Err(AttemptError::Failed(report)) => Err(report),
            Err(AttemptError::Conflict(first)) => {
                warn!(error = %first, "identity link raced, retrying");
                match self.attempt(provider, profile, tokens).await {
                    Ok(linked) => Ok(linked),
                    Err(AttemptError::Failed(report)) => Err(report),
                    Err(AttemptError::Conflict(second)) => {
                        warn!(error = %second, "identity link conflicted again");
                        Err(AuthError::IdentityConflict {
                            provider: provider.to_string(),
                        }
                        .into())
                    }
                }
            }
        }
    }

    async fn attempt(
        &self,
        provider: ProviderName,
        profile: &ProviderProfile,
        tokens: &ProviderTokens,
    ) -> Result<LinkedUser, AttemptError> {
        let access_token = self.cipher.seal_optional(tokens.access_token.as_deref())?;
        let refresh_token = self.cipher.seal_optional(tokens.refresh_token.as_deref())?;

        let existing = self
            .identities
            .find_by_provider_subject(provider, &profile.subject)
            .await
            .map_err(|e| failed("looking up identity", e))?;

        if let Some(mut identity) = existing {
            let user = self
                .users
                .find_by_id(identity.user_id())
                .await
                .map_err(|e| failed("loading linked user", e))?
                .ok_or_else(|| AuthError::Storage {
                    step: "loading linked user".to_string(),
                    details: format!("identity {} has no owning user", identity.id()),
                })?;

            identity.refresh(profile, access_token, refresh_token, tokens.expires_at);
            self.identities
                .update(&identity)
                .await
                .map_err(|e| failed("updating identity", e))?;

            debug!(user_id = %user.id(), "existing identity refreshed");
            return Ok(linked(&user));
        }

        if let Some(email) = profile.linkable_email() {
            let by_email = self
                .users
                .find_by_email(email)
                .await
                .map_err(|e| failed("looking up user by email", e))?;

            if let Some(user) = by_email {
                let identity = Identity::new(user.id(), provider, profile).with_tokens(
                    access_token,
                    refresh_token,
                    tokens.expires_at,
                );
                self.identities
                    .create(&identity)
                    .await
                    .map_err(|e| conflict_or_failed("linking identity", e))?;

                info!(user_id = %user.id(), "identity linked to existing user by email");
                return Ok(linked(&user));
            }
        }

        let user = User::new(
            profile.linkable_email().map(str::to_string),
            profile.name.clone(),
        )
        .with_avatar(profile.picture.clone());
        let identity = Identity::new(user.id(), provider, profile).with_tokens(
            access_token,
            refresh_token,
            tokens.expires_at,
        );
        self.identities
            .create_with_user(&user, &identity)
            .await
            .map_err(|e| conflict_or_failed("creating user", e))?;

        info!(user_id = %user.id(), "new user created from provider login");
        Ok(linked(&user))
    }
}

fn linked(user: &User) -> LinkedUser {
    LinkedUser {
        user_id: user.id(),
        email: user.email().map(str::to_string),
    }
}

fn failed(step: &str, err: StoreError) -> AttemptError {
    AttemptError::Failed(AuthError::storage(step, err).into())
}

fn conflict_or_failed(step: &str, err: StoreError) -> AttemptError {
    if err.is_conflict() {
        AttemptError::Conflict(err)
    } else {
        failed(step, err)
    }
}
