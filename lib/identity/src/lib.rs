//! Identity and credential handling for tollgate.
//!
//! This crate provides:
//! - Domain types (`User`, `Identity`, `Role`) and the closed set of
//!   supported identity providers (`ProviderName`)
//! - Storage traits implemented by the server's Postgres repositories
//! - The identity linker that resolves a provider login to a local user
//! - Session token issuing and verification (`JwtIssuer`)
//! - Email/password login and first-admin bootstrap (`PasswordAuthService`)
//! - Sealing of cached provider tokens at rest (`TokenCipher`)
//!
//! # Example
//!
//! ```
//! use tollgate_identity::{AuthConfig, JwtIssuer};
//! use tollgate_core::UserId;
//!
//! let config = AuthConfig::new(
//!     "https://app.example.com".to_string(),
//!     "a-long-random-signing-secret".to_string(),
//!     "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=".to_string(),
//! );
//! let issuer = JwtIssuer::new(&config);
//!
//! let user_id = UserId::new();
//! let token = issuer.issue(user_id, "alice@example.com").unwrap();
//! let claims = issuer.verify(&token).unwrap();
//!
//! assert_eq!(claims.user_id().unwrap(), user_id);
//! assert_eq!(claims.email, "alice@example.com");
//! ```

pub mod cipher;
pub mod config;
pub mod error;
pub mod identity;
pub mod jwt;
pub mod linker;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod password;
pub mod provider;
pub mod role;
pub mod store;
pub mod user;

// Re-export main types at crate root
pub use cipher::{SealedToken, TokenCipher};
pub use config::{AuthConfig, ProviderConfig, ProvidersConfig};
pub use error::{AuthError, ErrorClass, StoreError};
pub use identity::Identity;
pub use jwt::{JwtIssuer, SessionClaims};
pub use linker::{IdentityLinker, LinkedUser};
pub use password::{AdminAccount, PasswordAuthService, PasswordLogin};
pub use provider::{ProviderName, ProviderProfile, ProviderTokens};
pub use role::{ADMIN_ROLE, Role};
pub use store::{IdentityStore, RoleStore, UserStore};
pub use user::User;
