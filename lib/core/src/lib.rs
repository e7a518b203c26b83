//! Core identifiers shared by the tollgate crates.
//!
//! Every entity is keyed by a newtype over a random UUID so that a `UserId`
//! cannot be passed where a `RoleId` is expected.

pub mod id;

pub use id::{IdentityId, ParseIdError, RoleId, UserId};
