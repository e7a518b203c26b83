//! Error types for the identity crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `AuthError`: the closed set of authentication failures, carried in a
//!   `Report<AuthError>` up to the HTTP boundary
//! - `StoreError`: failures reported by storage implementations
//!
//! The `Display` output of `AuthError` carries internal detail and is meant for
//! logs. Clients only ever see [`AuthError::public_message`].

use std::fmt;

/// Coarse classification used by the HTTP layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Startup-time configuration problem.
    Configuration,
    /// The request itself is malformed.
    Validation,
    /// The caller could not be authenticated.
    Authentication,
    /// The request conflicts with existing state.
    Conflict,
    /// Unexpected server-side failure.
    Internal,
}

/// Errors from authentication operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Required configuration is missing or invalid.
    Configuration { details: String },
    /// OIDC discovery against a provider failed.
    Discovery { provider: String, details: String },
    /// The provider name is not supported or not configured.
    UnknownProvider { name: String },
    /// The request body or query failed validation.
    Validation { details: String },
    /// The `state` cookie is missing or does not match the callback state.
    CsrfStateMismatch,
    /// The authorization code could not be exchanged for tokens.
    TokenExchange { provider: String, details: String },
    /// The token response carried no ID token.
    MissingIdToken,
    /// The ID token failed signature, issuer, audience, expiry or nonce checks.
    InvalidIdToken { details: String },
    /// Email/password did not match a user with a password.
    InvalidCredentials,
    /// An admin user already exists.
    AdminAlreadyExists,
    /// The `Authorization` header is absent or not a bearer credential.
    MissingBearerToken,
    /// The session token is malformed, badly signed or expired.
    InvalidToken,
    /// Concurrent logins for the same provider account kept conflicting.
    IdentityConflict { provider: String },
    /// A storage operation failed.
    Storage { step: String, details: String },
    /// Signing a session token failed.
    Signing { details: String },
    /// Sealing or opening a provider token failed.
    Cipher { details: String },
    /// Hashing or checking a password failed.
    Hashing { details: String },
}

impl AuthError {
    /// Wraps a storage failure with the step that was being performed.
    #[must_use]
    pub fn storage(step: &str, err: StoreError) -> Self {
        Self::Storage {
            step: step.to_string(),
            details: err.to_string(),
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Configuration { .. } | Self::Discovery { .. } => ErrorClass::Configuration,
            Self::UnknownProvider { .. } | Self::Validation { .. } => ErrorClass::Validation,
            Self::CsrfStateMismatch
            | Self::TokenExchange { .. }
            | Self::MissingIdToken
            | Self::InvalidIdToken { .. }
            | Self::InvalidCredentials
            | Self::MissingBearerToken
            | Self::InvalidToken => ErrorClass::Authentication,
            Self::AdminAlreadyExists | Self::IdentityConflict { .. } => ErrorClass::Conflict,
            Self::Storage { .. }
            | Self::Signing { .. }
            | Self::Cipher { .. }
            | Self::Hashing { .. } => ErrorClass::Internal,
        }
    }

    /// Returns the message that is safe to show to clients.
    ///
    /// Credential failures share one message so that responses do not reveal
    /// whether an account exists.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::UnknownProvider { .. } => "unknown provider",
            Self::Validation { .. } => "invalid request",
            Self::CsrfStateMismatch => "invalid state",
            Self::TokenExchange { .. } | Self::MissingIdToken | Self::InvalidIdToken { .. } => {
                "authentication failed"
            }
            Self::InvalidCredentials => "invalid email or password",
            Self::AdminAlreadyExists => "admin user already exists",
            Self::MissingBearerToken => "missing bearer token",
            Self::InvalidToken => "invalid token",
            Self::IdentityConflict { .. } => "account is being linked, please retry",
            Self::Configuration { .. }
            | Self::Discovery { .. }
            | Self::Storage { .. }
            | Self::Signing { .. }
            | Self::Cipher { .. }
            | Self::Hashing { .. } => "internal server error",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { details } => write!(f, "configuration error: {details}"),
            Self::Discovery { provider, details } => {
                write!(f, "OIDC discovery for '{provider}' failed: {details}")
            }
            Self::UnknownProvider { name } => write!(f, "unknown provider: {name}"),
            Self::Validation { details } => write!(f, "invalid request: {details}"),
            Self::CsrfStateMismatch => write!(f, "CSRF state mismatch"),
            Self::TokenExchange { provider, details } => {
                write!(f, "token exchange with '{provider}' failed: {details}")
            }
            Self::MissingIdToken => write!(f, "no ID token in token response"),
            Self::InvalidIdToken { details } => write!(f, "ID token validation failed: {details}"),
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::AdminAlreadyExists => write!(f, "admin user already exists"),
            Self::MissingBearerToken => write!(f, "missing bearer token"),
            Self::InvalidToken => write!(f, "invalid session token"),
            Self::IdentityConflict { provider } => {
                write!(f, "identity for '{provider}' conflicted after retry")
            }
            Self::Storage { step, details } => write!(f, "storage error while {step}: {details}"),
            Self::Signing { details } => write!(f, "token signing failed: {details}"),
            Self::Cipher { details } => write!(f, "token cipher error: {details}"),
            Self::Hashing { details } => write!(f, "password hashing failed: {details}"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Errors from storage implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    Conflict { constraint: String },
    /// The backing store failed.
    Backend { details: String },
}

impl StoreError {
    /// Returns true if this is a unique-constraint violation.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict { constraint } => write!(f, "unique constraint violated: {constraint}"),
            Self::Backend { details } => write!(f, "backend failure: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}
