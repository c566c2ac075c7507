//! Capability validation over a type's transitive adoption set.
//!
//! Existence only: a required signature is satisfied when the type
//! implements it or any role in the set provides it. Precedence, conflicts
//! and vetoes are the engine's business and play no part here.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::{
    AdoptingType, CompositionError, CompositionResult, MethodSignature, MissingCapability,
    RoleDefinition, RoleId,
};

/// Check every required capability of `roles` against `ty`.
///
/// `roles` is the full transitive set (declared roles and everything they
/// compose). All misses are reported in one error, sorted by signature,
/// each naming the roles that require it.
pub fn validate(ty: &AdoptingType, roles: &[Arc<RoleDefinition>]) -> CompositionResult<()> {
    let mut required: BTreeMap<&MethodSignature, Vec<&RoleId>> = BTreeMap::new();
    for role in roles {
        for sig in role.required_capabilities() {
            required.entry(sig).or_default().push(role.id());
        }
    }

    let missing: Vec<MissingCapability> = required
        .into_iter()
        .filter(|(sig, _)| !ty.owns(sig) && !roles.iter().any(|r| r.provides_signature(sig)))
        .map(|(sig, by)| {
            let mut required_by: Vec<RoleId> = by.into_iter().cloned().collect();
            required_by.sort();
            required_by.dedup();
            MissingCapability {
                signature: sig.clone(),
                required_by,
            }
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CompositionError::MissingCapability {
            type_name: ty.name().to_string(),
            missing,
        })
    }
}
