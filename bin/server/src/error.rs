//! HTTP error mapping.
//!
//! Handlers return [`ApiError`], which wraps the `Report<AuthError>` produced
//! by the identity layer. The response carries only the fixed public message;
//! the full report is logged.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rootcause::Report;
use serde::Serialize;
use std::fmt;
use tollgate_identity::{AuthError, ErrorClass};

/// An error response produced by a handler.
#[derive(Debug)]
pub struct ApiError(Report<AuthError>);

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    message: &'static str,
}

impl ApiError {
    /// Returns the underlying authentication error.
    pub fn error(&self) -> &AuthError {
        self.0.current_context()
    }

    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self.error().class() {
            ErrorClass::Validation => StatusCode::BAD_REQUEST,
            ErrorClass::Authentication => StatusCode::UNAUTHORIZED,
            ErrorClass::Conflict => StatusCode::CONFLICT,
            ErrorClass::Configuration | ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Report<AuthError>> for ApiError {
    fn from(report: Report<AuthError>) -> Self {
        Self(report)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.error().class() {
            ErrorClass::Configuration | ErrorClass::Internal => {
                tracing::error!(error = %self.0, "request failed");
            }
            ErrorClass::Authentication | ErrorClass::Conflict => {
                tracing::warn!(error = %self.0, "request rejected");
            }
            ErrorClass::Validation => {
                tracing::debug!(error = %self.0, "invalid request");
            }
        }

        let body = ErrorBody {
            message: self.error().public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Errors that abort server startup.
#[derive(Debug)]
pub enum StartupError {
    /// Environment configuration could not be loaded.
    Config(config::ConfigError),
    /// Configuration was loaded but is unusable, or provider discovery failed.
    Auth(Report<AuthError>),
    /// The database could not be reached.
    Database(sqlx::Error),
    /// Applying migrations failed.
    Migrate(sqlx::migrate::MigrateError),
    /// Binding or serving the listener failed.
    Io(std::io::Error),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "failed to load configuration: {e}"),
            Self::Auth(report) => write!(f, "authentication setup failed: {report}"),
            Self::Database(e) => write!(f, "failed to connect to database: {e}"),
            Self::Migrate(e) => write!(f, "failed to run migrations: {e}"),
            Self::Io(e) => write!(f, "server I/O error: {e}"),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<config::ConfigError> for StartupError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<Report<AuthError>> for StartupError {
    fn from(report: Report<AuthError>) -> Self {
        Self::Auth(report)
    }
}

impl From<sqlx::Error> for StartupError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e)
    }
}

impl From<sqlx::migrate::MigrateError> for StartupError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Migrate(e)
    }
}

impl From<std::io::Error> for StartupError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
