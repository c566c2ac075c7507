//! Effective method tables and invocation context.
//!
//! A [`MethodTable`] is built once, when its type composes, and is never
//! mutated afterwards. Callers share it behind an `Arc`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::{DispatchError, DispatchResult};
use crate::domain::role::{Implementation, RoleId};
use crate::domain::signature::MethodSignature;

/// Where an effective method came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provider {
    /// Implemented directly by the adopting type.
    Own,
    /// Supplied by a role.
    Role {
        /// Role whose provided methods define the body.
        origin: RoleId,
        /// Declared role through which the body arrived.
        via: RoleId,
    },
}

impl Provider {
    pub fn origin(&self) -> Option<&RoleId> {
        match self {
            Provider::Own => None,
            Provider::Role { origin, .. } => Some(origin),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Own => write!(f, "own"),
            Provider::Role { origin, via } if origin == via => write!(f, "role {origin}"),
            Provider::Role { origin, via } => write!(f, "role {origin} (via {via})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodEntry {
    pub implementation: Implementation,
    pub provider: Provider,
}

/// A type's effective methods: own implementations plus resolved role bodies.
#[derive(Debug, Clone)]
pub struct MethodTable {
    type_name: String,
    entries: BTreeMap<MethodSignature, MethodEntry>,
}

impl MethodTable {
    pub(crate) fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            entries: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, signature: MethodSignature, entry: MethodEntry) {
        self.entries.insert(signature, entry);
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, signature: &MethodSignature) -> Option<&MethodEntry> {
        self.entries.get(signature)
    }

    pub fn contains(&self, signature: &MethodSignature) -> bool {
        self.entries.contains_key(signature)
    }

    pub fn provider_of(&self, signature: &MethodSignature) -> Option<&Provider> {
        self.entries.get(signature).map(|e| &e.provider)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in signature order.
    pub fn iter(&self) -> impl Iterator<Item = (&MethodSignature, &MethodEntry)> {
        self.entries.iter()
    }

    pub fn signatures(&self) -> impl Iterator<Item = &MethodSignature> {
        self.entries.keys()
    }

    /// Entries implemented by the type itself.
    pub fn own(&self) -> impl Iterator<Item = (&MethodSignature, &MethodEntry)> {
        self.entries
            .iter()
            .filter(|(_, e)| matches!(e.provider, Provider::Own))
    }

    /// Entries supplied by roles.
    pub fn role_derived(&self) -> impl Iterator<Item = (&MethodSignature, &MethodEntry)> {
        self.entries
            .iter()
            .filter(|(_, e)| matches!(e.provider, Provider::Role { .. }))
    }

    /// SHA-256 hex digest over `(signature, provider)` pairs in signature order.
    ///
    /// Two tables with the same shape have the same digest; bodies are not
    /// hashed, only their provenance.
    pub fn digest(&self) -> String {
        use sha2::Digest as _;
        let mut hasher = sha2::Sha256::new();
        for (sig, entry) in &self.entries {
            hasher.update(sig.to_string().as_bytes());
            hasher.update(b"\0");
            hasher.update(entry.provider.to_string().as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }

    /// Invoke `signature` with `receiver` as the instance state
    /// (`Value::Null` for type-level calls).
    pub fn invoke(
        &self,
        signature: &MethodSignature,
        receiver: &Value,
        args: &[Value],
    ) -> DispatchResult<Value> {
        let entry = self
            .entries
            .get(signature)
            .ok_or_else(|| DispatchError::MethodNotFound {
                type_name: self.type_name.clone(),
                signature: signature.clone(),
            })?;

        let invocation = Invocation {
            signature,
            receiver,
            table: self,
        };
        entry
            .implementation
            .call(&invocation, args)
            .map_err(|source| DispatchError::Method {
                type_name: self.type_name.clone(),
                signature: signature.clone(),
                source,
            })
    }
}

/// Context handed to a method body.
pub struct Invocation<'a> {
    signature: &'a MethodSignature,
    receiver: &'a Value,
    table: &'a MethodTable,
}

impl<'a> Invocation<'a> {
    pub fn type_name(&self) -> &str {
        self.table.type_name()
    }

    pub fn signature(&self) -> &MethodSignature {
        self.signature
    }

    pub fn receiver(&self) -> &Value {
        self.receiver
    }

    /// Call another method on the same receiver, e.g. a required capability.
    pub fn send(&self, signature: &MethodSignature, args: &[Value]) -> anyhow::Result<Value> {
        Ok(self.table.invoke(signature, self.receiver, args)?)
    }
}
