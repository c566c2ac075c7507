//! Role vocabulary: `RoleId`, `Implementation`, `RoleDefinition`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::{CompositionError, CompositionResult};
use crate::domain::signature::MethodSignature;
use crate::domain::table::Invocation;

/// Globally unique role name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(String);

impl RoleId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RoleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Signature of every method body, own or role-provided.
pub type MethodFn = dyn Fn(&Invocation<'_>, &[Value]) -> anyhow::Result<Value> + Send + Sync;

/// A labelled, shareable method body.
#[derive(Clone)]
pub struct Implementation {
    label: Arc<str>,
    func: Arc<MethodFn>,
}

impl Implementation {
    pub fn new<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Invocation<'_>, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            label: Arc::from(label.into()),
            func: Arc::new(func),
        }
    }

    /// A body that always returns `value`.
    pub fn constant(label: impl Into<String>, value: Value) -> Self {
        Self::new(label, move |_, _| Ok(value.clone()))
    }

    /// A body standing in for code that lives elsewhere; returns `null`.
    ///
    /// Used when checking declarations without their bodies.
    pub fn placeholder(label: impl Into<String>) -> Self {
        Self::new(label, |_, _| Ok(Value::Null))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn call(&self, invocation: &Invocation<'_>, args: &[Value]) -> anyhow::Result<Value> {
        (self.func)(invocation, args)
    }

    /// True when both handles share one body.
    pub fn same_body(&self, other: &Implementation) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl std::fmt::Debug for Implementation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Implementation").field(&self.label).finish()
    }
}

/// A named bundle of required capabilities and provided methods.
///
/// Definitions are static: built once, registered, then only read. A role is
/// never instantiated; it only hosts `provided` bodies for adopting types.
#[derive(Debug, Clone)]
pub struct RoleDefinition {
    id: RoleId,
    required: BTreeSet<MethodSignature>,
    provided: BTreeMap<MethodSignature, Implementation>,
    public: BTreeSet<MethodSignature>,
    composed: Vec<RoleId>,
    storage: Vec<String>,
}

impl RoleDefinition {
    pub fn new(id: impl Into<RoleId>) -> Self {
        Self {
            id: id.into(),
            required: BTreeSet::new(),
            provided: BTreeMap::new(),
            public: BTreeSet::new(),
            composed: Vec::new(),
            storage: Vec::new(),
        }
    }

    /// Declare a capability the adopter must supply.
    pub fn requires(mut self, signature: MethodSignature) -> Self {
        self.required.insert(signature);
        self
    }

    /// Provide a public method.
    pub fn provides(mut self, signature: MethodSignature, implementation: Implementation) -> Self {
        self.public.insert(signature.clone());
        self.provided.insert(signature, implementation);
        self
    }

    /// Provide an internal method that is not part of the public list.
    pub fn provides_private(
        mut self,
        signature: MethodSignature,
        implementation: Implementation,
    ) -> Self {
        self.provided.insert(signature, implementation);
        self
    }

    /// Add a signature to the public list without supplying a body.
    ///
    /// Registration rejects the role unless a body is also provided.
    pub fn declares_public(mut self, signature: MethodSignature) -> Self {
        self.public.insert(signature);
        self
    }

    /// Adopt another role. Order is kept; repeats are ignored.
    pub fn composes(mut self, role: impl Into<RoleId>) -> Self {
        let role = role.into();
        if !self.composed.contains(&role) {
            self.composed.push(role);
        }
        self
    }

    /// Declare a storage field. Roles cannot extend storage, so any field
    /// makes the role fail its storage check.
    pub fn with_storage(mut self, field: impl Into<String>) -> Self {
        self.storage.push(field.into());
        self
    }

    pub fn id(&self) -> &RoleId {
        &self.id
    }

    pub fn required_capabilities(&self) -> &BTreeSet<MethodSignature> {
        &self.required
    }

    pub fn provided_methods(&self) -> &BTreeMap<MethodSignature, Implementation> {
        &self.provided
    }

    pub fn public_signatures(&self) -> &BTreeSet<MethodSignature> {
        &self.public
    }

    pub fn composed_roles(&self) -> &[RoleId] {
        &self.composed
    }

    pub fn storage_fields(&self) -> &[String] {
        &self.storage
    }

    pub fn provides_signature(&self, signature: &MethodSignature) -> bool {
        self.provided.contains_key(signature)
    }

    /// Check the definition's internal invariants.
    ///
    /// - every public signature has a provided body
    /// - the role does not compose itself directly
    pub fn validate(&self) -> CompositionResult<()> {
        let unbacked: Vec<String> = self
            .public
            .iter()
            .filter(|sig| !self.provided.contains_key(*sig))
            .map(ToString::to_string)
            .collect();
        if !unbacked.is_empty() {
            return Err(CompositionError::InvalidRoleDefinition {
                role: self.id.clone(),
                reason: format!(
                    "public signatures without a provided body: {}",
                    unbacked.join(", ")
                ),
            });
        }

        if self.composed.contains(&self.id) {
            return Err(CompositionError::RoleCycle {
                cycle: vec![self.id.clone(), self.id.clone()],
            });
        }

        Ok(())
    }

    /// Fails with [`CompositionError::StorageExtension`] if any storage is declared.
    pub fn check_storage(&self) -> CompositionResult<()> {
        if self.storage.is_empty() {
            Ok(())
        } else {
            Err(CompositionError::StorageExtension {
                role: self.id.clone(),
                fields: self.storage.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(label: &str) -> Implementation {
        Implementation::placeholder(label)
    }

    #[test]
    fn test_provides_adds_to_public_list() {
        let role = RoleDefinition::new("Greeter")
            .provides(MethodSignature::instance("greet"), noop("Greeter.greet"))
            .provides_private(MethodSignature::instance("helper"), noop("Greeter.helper"));

        assert!(role
            .public_signatures()
            .contains(&MethodSignature::instance("greet")));
        assert!(!role
            .public_signatures()
            .contains(&MethodSignature::instance("helper")));
        assert_eq!(role.provided_methods().len(), 2);
        assert!(role.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_public_signature_without_body() {
        let role =
            RoleDefinition::new("Broken").declares_public(MethodSignature::instance("ghost"));
        match role.validate() {
            Err(CompositionError::InvalidRoleDefinition { role, reason }) => {
                assert_eq!(role.as_str(), "Broken");
                assert!(reason.contains("ghost"));
            }
            other => panic!("Expected InvalidRoleDefinition, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_self_composition() {
        let role = RoleDefinition::new("Ouroboros").composes("Ouroboros");
        assert!(matches!(
            role.validate(),
            Err(CompositionError::RoleCycle { .. })
        ));
    }

    #[test]
    fn test_composes_ignores_repeats() {
        let role = RoleDefinition::new("A").composes("B").composes("C").composes("B");
        let ids: Vec<&str> = role.composed_roles().iter().map(RoleId::as_str).collect();
        assert_eq!(ids, vec!["B", "C"]);
    }

    #[test]
    fn test_check_storage() {
        assert!(RoleDefinition::new("Plain").check_storage().is_ok());
        let err = RoleDefinition::new("Stateful")
            .with_storage("counter")
            .check_storage()
            .unwrap_err();
        assert_eq!(
            err,
            CompositionError::StorageExtension {
                role: RoleId::from("Stateful"),
                fields: vec!["counter".to_string()],
            }
        );
    }

    #[test]
    fn test_implementation_same_body() {
        let a = noop("a");
        let b = a.clone();
        let c = noop("a");
        assert!(a.same_body(&b));
        assert!(!a.same_body(&c));
        assert_eq!(format!("{:?}", a), "Implementation(\"a\")");
    }
}
