//! Ownership policy abstraction.

use tracing::info;

use super::AccessError;
use super::actor::Actor;
use crate::models::clinical::OwnerScope;

/// What the actor wants to do with an existing resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Update,
    Delete,
}

/// Per-resource ownership rules.
pub trait OwnershipPolicy {
    type Resource;

    /// Human name used in not-found messages.
    const LABEL: &'static str;

    /// The rows the actor may list.
    fn list_scope(actor: &Actor) -> Result<OwnerScope, AccessError>;

    /// Decide whether `actor` may perform `action` on `resource`.
    fn authorize(actor: &Actor, action: Action, resource: &Self::Resource)
    -> Result<(), AccessError>;
}

/// Decide on a resource that has already been loaded.
///
/// A missing resource is `NotFound`. A read denied by ownership is also
/// reported as `NotFound`, so reads never reveal that a row exists; writes
/// get `NotAuthorized`.
pub fn authorize_loaded<P: OwnershipPolicy>(
    actor: &Actor,
    action: Action,
    loaded: Option<P::Resource>,
) -> Result<P::Resource, AccessError> {
    let not_found = || AccessError::NotFound(format!("{} not found", P::LABEL));
    let resource = loaded.ok_or_else(not_found)?;
    match P::authorize(actor, action, &resource) {
        Ok(()) => Ok(resource),
        Err(AccessError::NotAuthorized(reason)) => {
            info!(actor = %actor.describe(), ?action, resource = P::LABEL, %reason, "ownership check failed");
            if action == Action::Read {
                Err(not_found())
            } else {
                Err(AccessError::NotAuthorized(reason))
            }
        }
        Err(e) => Err(e),
    }
}

/// Shared rejection for actors a resource type has no rule for.
pub(crate) fn no_access(actor: &Actor, label: &str) -> AccessError {
    AccessError::NotAuthorized(format!("{} has no access to {label}s", actor.describe()))
}

/// Whether `owner` matches the actor's profile ID.
pub(crate) fn owns(profile_id: &str, owner: &str) -> Result<(), AccessError> {
    if profile_id == owner {
        Ok(())
    } else {
        Err(AccessError::NotAuthorized(format!(
            "profile {profile_id} does not own this resource"
        )))
    }
}
