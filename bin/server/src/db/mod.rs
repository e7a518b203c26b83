//! Postgres repositories implementing the identity store traits.
//!
//! Each repository holds a clone of the shared `PgPool`. Unique-constraint
//! violations are reported as `StoreError::Conflict` so the identity linker
//! can retry a lost race.

pub mod identity;
pub mod role;
pub mod user;

pub use identity::IdentityRepository;
pub use role::RoleRepository;
pub use user::UserRepository;

use tollgate_identity::StoreError;

/// Maps a sqlx error onto the store error the identity crate understands.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err
        && db.is_unique_violation()
    {
        return StoreError::Conflict {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        };
    }
    StoreError::Backend {
        details: err.to_string(),
    }
}

fn decode_error(details: String) -> StoreError {
    StoreError::Backend { details }
}
