//! Role registry: populated once at startup, then frozen and read-only.
//!
//! Registration goes through [`RoleRegistryBuilder`]; [`RoleRegistryBuilder::freeze`]
//! hands back an immutable [`RoleRegistry`] whose lookups take no lock.
//! Each registered role carries its own one-shot closure slot, so a role
//! that composes other roles is flattened exactly once per process.

use std::collections::HashMap;
use std::sync::Arc;

use crate::closure::{self, RoleClosure};
use crate::config::{ComposerConfig, StorageCheck};
use crate::domain::{CompositionError, CompositionResult, RoleDefinition, RoleId};
use crate::linearize;
use crate::obs;
use crate::slot::OneShot;

pub(crate) struct RegisteredRole {
    pub(crate) definition: Arc<RoleDefinition>,
    pub(crate) closure: OneShot<RoleClosure>,
}

/// Append-only collection of role definitions under construction.
pub struct RoleRegistryBuilder {
    storage_check: StorageCheck,
    roles: HashMap<RoleId, Arc<RegisteredRole>>,
    order: Vec<RoleId>,
}

impl Default for RoleRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleRegistryBuilder {
    pub fn new() -> Self {
        Self {
            storage_check: StorageCheck::default(),
            roles: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn from_config(config: &ComposerConfig) -> Self {
        Self::new().with_storage_check(config.storage_check)
    }

    pub fn with_storage_check(mut self, check: StorageCheck) -> Self {
        self.storage_check = check;
        self
    }

    /// Register a role definition.
    ///
    /// Order-independent: a role may compose roles registered after it.
    ///
    /// # Errors
    ///
    /// - [`CompositionError::DuplicateRole`] if the identity already exists.
    /// - [`CompositionError::InvalidRoleDefinition`] if a public signature has no body.
    /// - [`CompositionError::StorageExtension`] if the role declares storage and
    ///   storage is checked at registration.
    pub fn register(&mut self, definition: RoleDefinition) -> CompositionResult<()> {
        if self.roles.contains_key(definition.id()) {
            return Err(CompositionError::DuplicateRole {
                role: definition.id().clone(),
            });
        }
        definition.validate()?;
        if self.storage_check == StorageCheck::AtRegistration {
            definition.check_storage()?;
        }

        obs::emit_role_registered(
            definition.id().as_str(),
            definition.provided_methods().len(),
            definition.required_capabilities().len(),
        );

        let id = definition.id().clone();
        self.roles.insert(
            id.clone(),
            Arc::new(RegisteredRole {
                definition: Arc::new(definition),
                closure: OneShot::new(),
            }),
        );
        self.order.push(id);
        Ok(())
    }

    pub fn contains(&self, id: &RoleId) -> bool {
        self.roles.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Stop accepting registrations.
    pub fn freeze(self) -> RoleRegistry {
        obs::emit_registry_frozen(self.roles.len());
        RoleRegistry {
            roles: self.roles,
            order: self.order,
        }
    }
}

/// Frozen, read-only role registry.
pub struct RoleRegistry {
    roles: HashMap<RoleId, Arc<RegisteredRole>>,
    order: Vec<RoleId>,
}

impl RoleRegistry {
    pub fn builder() -> RoleRegistryBuilder {
        RoleRegistryBuilder::new()
    }

    /// Look a role up by identity.
    ///
    /// Returns [`CompositionError::UnknownRole`] if absent.
    pub fn lookup(&self, id: &RoleId) -> CompositionResult<Arc<RoleDefinition>> {
        self.entry(id).map(|e| Arc::clone(&e.definition))
    }

    pub fn contains(&self, id: &RoleId) -> bool {
        self.roles.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Role identities in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &RoleId> {
        self.order.iter()
    }

    /// Startup audit over the whole registered set.
    ///
    /// Returns [`CompositionError::RoleCycle`] for the first cycle found and
    /// [`CompositionError::UnknownRole`] for a dangling `composes` reference.
    /// Composition performs the same checks per type, so calling this is
    /// optional.
    pub fn check_acyclic(&self) -> CompositionResult<()> {
        linearize::resolution_order(self, &self.order).map(|_| ())
    }

    /// The flattened closure of a role: every candidate it and the roles it
    /// composes offer, per signature, computed once.
    pub fn closure(&self, id: &RoleId) -> CompositionResult<Arc<RoleClosure>> {
        linearize::resolution_order(self, std::slice::from_ref(id))?;
        self.closure_resolved(id)
    }

    /// Closure lookup for roles whose composition graph is already known to
    /// be acyclic.
    pub(crate) fn closure_resolved(&self, id: &RoleId) -> CompositionResult<Arc<RoleClosure>> {
        let entry = self.entry(id)?;
        entry.closure.run_once(
            || closure::build(self, &entry.definition),
            || CompositionError::RoleCycle {
                cycle: vec![id.clone(), id.clone()],
            },
            |message| CompositionError::CompositionPanicked {
                owner: format!("role {id}"),
                message,
            },
        )
    }

    pub(crate) fn entry(&self, id: &RoleId) -> CompositionResult<&Arc<RegisteredRole>> {
        self.roles
            .get(id)
            .ok_or_else(|| CompositionError::UnknownRole { role: id.clone() })
    }
}

impl std::fmt::Debug for RoleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleRegistry")
            .field("roles", &self.order)
            .finish()
    }
}
