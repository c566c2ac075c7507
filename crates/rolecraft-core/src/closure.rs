//! Role closures: every method a role brings to an adopter, its own provided
//! methods together with those of the roles it composes, transitively.
//!
//! A closure decides nothing. Each signature keeps every candidate that
//! reaches it, one per origin role, and the adopting type resolves them
//! against its own methods and veto hook. The same origin reached along
//! several paths (a diamond) is kept once.

use std::collections::BTreeMap;

use crate::domain::{CompositionResult, Implementation, MethodSignature, RoleDefinition, RoleId};
use crate::registry::RoleRegistry;

/// A method body together with the role that defined it.
#[derive(Debug, Clone)]
pub struct ClosureEntry {
    pub origin: RoleId,
    pub implementation: Implementation,
}

/// Everything a role contributes to an adopter.
#[derive(Debug)]
pub struct RoleClosure {
    role: RoleId,
    methods: BTreeMap<MethodSignature, Vec<ClosureEntry>>,
}

impl RoleClosure {
    pub fn role(&self) -> &RoleId {
        &self.role
    }

    pub fn methods(&self) -> &BTreeMap<MethodSignature, Vec<ClosureEntry>> {
        &self.methods
    }

    /// Candidates for `signature`, the role's own entry first.
    pub fn candidates(&self, signature: &MethodSignature) -> &[ClosureEntry] {
        self.methods.get(signature).map_or(&[], Vec::as_slice)
    }

    /// Signatures offered by more than one origin. An adopter has to own or
    /// veto its way out of each of these.
    pub fn contested(&self) -> impl Iterator<Item = (&MethodSignature, &[ClosureEntry])> {
        self.methods
            .iter()
            .filter(|(_, entries)| entries.len() > 1)
            .map(|(sig, entries)| (sig, entries.as_slice()))
    }

    /// Number of distinct signatures.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Build the closure for `definition`, pulling composed roles' closures
/// through the registry's one-shot slots.
pub(crate) fn build(
    registry: &RoleRegistry,
    definition: &RoleDefinition,
) -> CompositionResult<RoleClosure> {
    let mut methods: BTreeMap<MethodSignature, Vec<ClosureEntry>> = definition
        .provided_methods()
        .iter()
        .map(|(sig, implementation)| {
            let entry = ClosureEntry {
                origin: definition.id().clone(),
                implementation: implementation.clone(),
            };
            (sig.clone(), vec![entry])
        })
        .collect();

    for dependency in definition.composed_roles() {
        let inner = registry.closure_resolved(dependency)?;
        for (sig, offered) in inner.methods() {
            let candidates = methods.entry(sig.clone()).or_default();
            for entry in offered {
                if !candidates.iter().any(|c| c.origin == entry.origin) {
                    candidates.push(entry.clone());
                }
            }
        }
    }

    Ok(RoleClosure {
        role: definition.id().clone(),
        methods,
    })
}
