use std::collections::HashMap;
use std::sync::RwLock;

use manifesto_types::{ActorAuthorityBinding, ActorId, AuthorityPolicy};
use tracing::info;

use crate::error::ProtocolError;

/// Maps actor identity to an authority reference and policy. Leaf
/// component; the orchestrator mirrors bindings into the store.
pub struct ActorRegistry {
    bindings: RwLock<HashMap<ActorId, ActorAuthorityBinding>>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
        }
    }

    /// Register an actor under a policy. Idempotent per actor:
    /// re-registration replaces the existing binding.
    pub fn register(&self, actor: ActorId, policy: AuthorityPolicy) -> ActorAuthorityBinding {
        let binding = ActorAuthorityBinding::new(actor.clone(), policy);
        info!(actor = %actor, authority = %binding.authority, "actor registered");
        self.write().insert(actor, binding.clone());
        binding
    }

    /// Replace the policy of an already-registered actor.
    pub fn update_binding(
        &self,
        actor: &ActorId,
        policy: AuthorityPolicy,
    ) -> Result<ActorAuthorityBinding, ProtocolError> {
        let mut bindings = self.write();
        if !bindings.contains_key(actor) {
            return Err(ProtocolError::ActorNotRegistered {
                actor: actor.to_string(),
            });
        }
        let binding = ActorAuthorityBinding::new(actor.clone(), policy);
        bindings.insert(actor.clone(), binding.clone());
        Ok(binding)
    }

    pub fn get_binding(&self, actor: &ActorId) -> Option<ActorAuthorityBinding> {
        self.read().get(actor).cloned()
    }

    pub fn list_actors(&self) -> Vec<ActorId> {
        let mut actors: Vec<ActorId> = self.read().keys().cloned().collect();
        actors.sort();
        actors
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<ActorId, ActorAuthorityBinding>> {
        self.bindings.read().expect("registry lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<ActorId, ActorAuthorityBinding>> {
        self.bindings.write().expect("registry lock poisoned")
    }
}

impl Default for ActorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
