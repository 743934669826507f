//! Acting-user identity collaborator
//!
//! Mutating operations stamp `created_by`/`updated_by` and audit events
//! with the current actor. When no identity is available, mutations fail
//! with `AuthenticationRequired`; reads never consult identity.

use uuid::Uuid;

/// The user on whose behalf a mutation runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
}

impl Actor {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
        }
    }
}

/// Supplies the current acting user, typically backed by a session
pub trait IdentityProvider: Send + Sync {
    /// The actor for the current call, or `None` when unauthenticated
    fn current_actor(&self) -> Option<Actor>;
}

/// Always reports the same actor. Development and test default.
pub struct FixedIdentityProvider {
    actor: Actor,
}

impl FixedIdentityProvider {
    pub fn new(actor: Actor) -> Self {
        Self { actor }
    }
}

impl IdentityProvider for FixedIdentityProvider {
    fn current_actor(&self) -> Option<Actor> {
        Some(self.actor.clone())
    }
}

/// Never reports an actor; every mutation fails authentication
pub struct NoIdentityProvider;

impl IdentityProvider for NoIdentityProvider {
    fn current_actor(&self) -> Option<Actor> {
        None
    }
}
