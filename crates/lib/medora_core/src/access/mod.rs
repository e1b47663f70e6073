//! Authorization: the role guard, actor resolution and per-resource
//! ownership policies.
//!
//! Decisions are pure functions over an [`actor::Actor`] and an already
//! loaded resource. Loading happens first, in the caller; see
//! [`policy::authorize_loaded`].

pub mod actor;
pub mod appointment;
pub mod consultation;
pub mod guard;
pub mod policy;
pub mod prescription;

use thiserror::Error;

use crate::store::StoreError;

/// Authorization errors.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The reason is for operator logs only; callers see a fixed message.
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
