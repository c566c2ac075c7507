//! Declarative role and type manifests.
//!
//! A manifest carries the *shape* of roles and adopting types: signatures,
//! adoption edges, storage declarations and veto exclusions. Method bodies
//! come from a [`MethodCatalog`] keyed by `(owner, signature)`. A catalog in
//! placeholder mode fills every gap with a null-returning body, which is
//! enough to check a manifest without running any of its code.
//!
//! Both JSON and TOML spellings are accepted by the serde model; arrays of
//! tables read naturally in TOML:
//!
//! ```toml
//! [[role]]
//! name = "Greeter"
//! requires = ["name"]
//! provides = ["greet"]
//!
//! [[type]]
//! name = "Person"
//! adopts = ["Greeter"]
//! implements = ["name"]
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    AdoptingType, CompositionError, CompositionResult, Implementation, MethodSignature,
    RoleDefinition, RoleId,
};
use crate::engine::{CompositionEngine, TypeHandle};
use crate::registry::RoleRegistryBuilder;
use crate::resolver::DeclarativeVeto;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "role", alias = "roles")]
    pub roles: Vec<RoleDecl>,
    #[serde(default, rename = "type", alias = "types")]
    pub types: Vec<TypeDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDecl {
    pub name: RoleId,
    #[serde(default)]
    pub requires: Vec<MethodSignature>,
    /// Public provided methods.
    #[serde(default)]
    pub provides: Vec<MethodSignature>,
    /// Provided methods kept off the public list.
    #[serde(default)]
    pub private: Vec<MethodSignature>,
    #[serde(default)]
    pub composes: Vec<RoleId>,
    #[serde(default)]
    pub storage: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    #[serde(default)]
    pub adopts: Vec<RoleId>,
    #[serde(default)]
    pub implements: Vec<MethodSignature>,
    #[serde(default)]
    pub veto: Vec<VetoDecl>,
}

/// Exclude `role`'s body for `method` from the declaring type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VetoDecl {
    pub role: RoleId,
    pub method: MethodSignature,
}

/// Method bodies keyed by owner (role or type name) and signature.
#[derive(Debug, Clone, Default)]
pub struct MethodCatalog {
    bindings: HashMap<(String, MethodSignature), Implementation>,
    placeholders: bool,
}

impl MethodCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog that substitutes a placeholder body for anything unbound.
    pub fn with_placeholders() -> Self {
        Self {
            bindings: HashMap::new(),
            placeholders: true,
        }
    }

    pub fn bind(
        mut self,
        owner: impl Into<String>,
        signature: MethodSignature,
        implementation: Implementation,
    ) -> Self {
        self.bindings.insert((owner.into(), signature), implementation);
        self
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The body bound for `(owner, signature)`.
    ///
    /// Fails with [`CompositionError::UnboundImplementation`] unless the
    /// catalog is in placeholder mode.
    pub fn resolve(
        &self,
        owner: &str,
        signature: &MethodSignature,
    ) -> CompositionResult<Implementation> {
        if let Some(bound) = self.bindings.get(&(owner.to_string(), signature.clone())) {
            return Ok(bound.clone());
        }
        if self.placeholders {
            return Ok(Implementation::placeholder(format!("{owner}.{signature}")));
        }
        Err(CompositionError::UnboundImplementation {
            owner: owner.to_string(),
            signature: signature.clone(),
        })
    }
}

impl Manifest {
    pub fn from_json_str(input: &str) -> CompositionResult<Self> {
        serde_json::from_str(input).map_err(|e| CompositionError::Manifest(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> CompositionResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CompositionError::Manifest(e.to_string()))
    }

    /// Register every declared role with `builder`, stopping at the first error.
    pub fn install(
        &self,
        catalog: &MethodCatalog,
        builder: &mut RoleRegistryBuilder,
    ) -> CompositionResult<()> {
        for decl in &self.roles {
            builder.register(decl.to_definition(catalog)?)?;
        }
        Ok(())
    }

    /// Declare every type with `engine`, in manifest order.
    pub fn declare_types(
        &self,
        catalog: &MethodCatalog,
        engine: &CompositionEngine,
    ) -> CompositionResult<Vec<TypeHandle>> {
        self.types
            .iter()
            .map(|decl| engine.declare(decl.to_adopting_type(catalog)?))
            .collect()
    }
}

impl RoleDecl {
    pub fn to_definition(&self, catalog: &MethodCatalog) -> CompositionResult<RoleDefinition> {
        let owner = self.name.as_str();
        let mut def = RoleDefinition::new(self.name.clone());
        for sig in &self.requires {
            def = def.requires(sig.clone());
        }
        for sig in &self.provides {
            def = def.provides(sig.clone(), catalog.resolve(owner, sig)?);
        }
        for sig in &self.private {
            def = def.provides_private(sig.clone(), catalog.resolve(owner, sig)?);
        }
        for role in &self.composes {
            def = def.composes(role.clone());
        }
        for field in &self.storage {
            def = def.with_storage(field.clone());
        }
        Ok(def)
    }
}

impl TypeDecl {
    pub fn to_adopting_type(&self, catalog: &MethodCatalog) -> CompositionResult<AdoptingType> {
        let mut ty = AdoptingType::new(self.name.clone());
        for role in &self.adopts {
            ty = ty.adopts(role.clone());
        }
        for sig in &self.implements {
            ty = ty.implements(sig.clone(), catalog.resolve(&self.name, sig)?);
        }
        if !self.veto.is_empty() {
            let veto = self.veto.iter().fold(DeclarativeVeto::new(), |v, d| {
                v.exclude(d.role.clone(), d.method.clone())
            });
            ty = ty.with_veto(veto);
        }
        Ok(ty)
    }
}
