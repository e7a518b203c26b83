//! Session token issuing and verification.
//!
//! Session tokens are HS256 JWTs carrying `sub`, `email`, `iat` and `exp`.
//! They are not persisted anywhere; a token is valid until its `exp`.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use tollgate_core::{ParseIdError, UserId};
use tracing::debug;

use crate::config::AuthConfig;
use crate::error::AuthError;

const BEARER_PREFIX: &str = "Bearer ";

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// The user ID as a hyphenated UUID.
    pub sub: String,
    /// The user's email, empty if the user has none.
    pub email: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
}

impl SessionClaims {
    /// Parses the `sub` claim back into a user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if `sub` is not a UUID.
    pub fn user_id(&self) -> Result<UserId, ParseIdError> {
        self.sub.parse()
    }
}

/// Issues and verifies session tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct JwtIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
}

impl JwtIssuer {
    /// Creates an issuer from the auth configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl_seconds: config.access_ttl_minutes().saturating_mul(60),
        }
    }

    /// Issues a token for `user_id` valid for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if encoding fails.
    pub fn issue(&self, user_id: UserId, email: &str) -> Result<String, Report<AuthError>> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_seconds),
        };
        self.sign(&claims)
    }

    /// Signs arbitrary claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if encoding fails.
    pub fn sign(&self, claims: &SessionClaims) -> Result<String, Report<AuthError>> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            AuthError::Signing {
                details: e.to_string(),
            }
            .into()
        })
    }

    /// Verifies a compact token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for any malformed, badly signed or
    /// expired token. The underlying reason is only logged.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, Report<AuthError>> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "session token rejected");
                AuthError::InvalidToken
            })?;
        Ok(data.claims)
    }

    /// Verifies the value of an `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingBearerToken` if the header is absent or not
    /// of the form `Bearer <token>`, otherwise as [`JwtIssuer::verify`].
    pub fn verify_bearer(&self, header: Option<&str>) -> Result<SessionClaims, Report<AuthError>> {
        let token = header
            .and_then(|h| h.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingBearerToken)?;
        self.verify(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(secret: &str) -> JwtIssuer {
        JwtIssuer::new(&AuthConfig::new(
            "https://api.example.com".to_string(),
            secret.to_string(),
            String::new(),
        ))
    }

    fn claims_expiring_in(seconds: i64) -> SessionClaims {
        let now = Utc::now().timestamp();
        SessionClaims {
            sub: UserId::new().to_string(),
            email: "a@x.com".to_string(),
            iat: now - 60,
            exp: now + seconds,
        }
    }

    #[test]
    fn issue_then_verify_round_trips() {
        let issuer = issuer("secret");
        let user_id = UserId::new();
        let token = issuer.issue(user_id, "a@x.com").expect("issue");
        let claims = issuer.verify(&token).expect("verify");

        assert_eq!(claims.user_id().expect("uuid sub"), user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn oversized_ttl_saturates_instead_of_overflowing() {
        let config = AuthConfig::new(
            "https://api.example.com".to_string(),
            "secret".to_string(),
            String::new(),
        )
        .with_access_ttl_minutes(i64::MAX / 2);
        let token = JwtIssuer::new(&config)
            .issue(UserId::new(), "a@x.com")
            .expect("issue");
        assert!(!token.is_empty());
    }

    #[test]
    fn header_is_hs256() {
        let token = issuer("secret")
            .issue(UserId::new(), "")
            .expect("issue");
        let header = jsonwebtoken::decode_header(&token).expect("header");
        assert_eq!(header.alg, Algorithm::HS256);
    }

    #[test]
    fn expired_by_one_second_is_rejected() {
        let issuer = issuer("secret");
        let token = issuer.sign(&claims_expiring_in(-1)).expect("sign");
        let err = issuer.verify(&token).unwrap_err();
        assert_eq!(*err.current_context(), AuthError::InvalidToken);
    }

    #[test]
    fn valid_for_one_more_second_is_accepted() {
        let issuer = issuer("secret");
        let token = issuer.sign(&claims_expiring_in(1)).expect("sign");
        assert!(issuer.verify(&token).is_ok());
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = issuer("one").issue(UserId::new(), "a@x.com").expect("issue");
        assert!(issuer("two").verify(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(issuer("secret").verify("not.a.jwt").is_err());
    }

    #[test]
    fn bearer_header_is_required() {
        let issuer = issuer("secret");
        let token = issuer.issue(UserId::new(), "a@x.com").expect("issue");

        for header in [None, Some(token.as_str()), Some("Basic abc"), Some("Bearer ")] {
            let err = issuer.verify_bearer(header).unwrap_err();
            assert_eq!(*err.current_context(), AuthError::MissingBearerToken);
        }

        let header = format!("Bearer {token}");
        assert!(issuer.verify_bearer(Some(&header)).is_ok());
    }

    #[test]
    fn malformed_bearer_token_is_invalid_token() {
        let err = issuer("secret")
            .verify_bearer(Some("Bearer abc.def"))
            .unwrap_err();
        assert_eq!(*err.current_context(), AuthError::InvalidToken);
    }
}
