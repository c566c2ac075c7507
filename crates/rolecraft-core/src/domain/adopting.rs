//! Adopting types and their composition state.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::role::{Implementation, RoleId};
use crate::domain::signature::MethodSignature;
use crate::resolver::VetoHook;

/// Where a type is in its one-shot composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionState {
    Uncomposed,
    Composing,
    Composed,
    Failed,
}

impl CompositionState {
    /// `Composed` and `Failed` never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CompositionState::Composed | CompositionState::Failed)
    }
}

impl std::fmt::Display for CompositionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompositionState::Uncomposed => "uncomposed",
            CompositionState::Composing => "composing",
            CompositionState::Composed => "composed",
            CompositionState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A type that adopts roles and owns some methods itself.
#[derive(Clone)]
pub struct AdoptingType {
    name: String,
    declared_roles: Vec<RoleId>,
    own_methods: BTreeMap<MethodSignature, Implementation>,
    veto: Option<Arc<dyn VetoHook>>,
}

impl AdoptingType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_roles: Vec::new(),
            own_methods: BTreeMap::new(),
            veto: None,
        }
    }

    /// Adopt a role. Declaration order only shapes diagnostics.
    pub fn adopts(mut self, role: impl Into<RoleId>) -> Self {
        self.declared_roles.push(role.into());
        self
    }

    /// Implement a method directly; own methods always beat role bodies.
    pub fn implements(
        mut self,
        signature: MethodSignature,
        implementation: Implementation,
    ) -> Self {
        self.own_methods.insert(signature, implementation);
        self
    }

    pub fn with_veto(self, hook: impl VetoHook + 'static) -> Self {
        self.with_veto_arc(Arc::new(hook))
    }

    pub fn with_veto_arc(mut self, hook: Arc<dyn VetoHook>) -> Self {
        self.veto = Some(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_roles(&self) -> &[RoleId] {
        &self.declared_roles
    }

    pub fn own_methods(&self) -> &BTreeMap<MethodSignature, Implementation> {
        &self.own_methods
    }

    pub fn owns(&self, signature: &MethodSignature) -> bool {
        self.own_methods.contains_key(signature)
    }

    pub fn veto(&self) -> Option<&dyn VetoHook> {
        self.veto.as_deref()
    }
}

impl std::fmt::Debug for AdoptingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdoptingType")
            .field("name", &self.name)
            .field("declared_roles", &self.declared_roles)
            .field("own_methods", &self.own_methods.keys().collect::<Vec<_>>())
            .field("has_veto", &self.veto.is_some())
            .finish()
    }
}
