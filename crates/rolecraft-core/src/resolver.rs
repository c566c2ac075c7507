//! Conflict resolution and veto hooks.
//!
//! Every role-provided candidate for a signature is offered to the adopting
//! type's veto hook exactly once. What survives decides the signature:
//!
//! - one survivor → it is selected
//! - none → the signature is omitted (the type opted out of every provider)
//! - two or more → ambiguous, a fatal conflict for the type
//!
//! The hook sees one candidate at a time, never the full set of contenders.

use std::collections::HashSet;

use crate::domain::{AdoptingType, Implementation, MethodLevel, MethodSignature, RoleId};
use crate::obs;

/// Adopting-type predicate excluding individual role-provided methods.
///
/// Both entry points default to including everything. A hook is consulted
/// only while its type composes; decisions are frozen afterwards.
pub trait VetoHook: Send + Sync {
    /// Whether `role`'s instance-level `signature` joins the type.
    fn include_instance_method(&self, role: &RoleId, signature: &MethodSignature) -> bool {
        let _ = (role, signature);
        true
    }

    /// Whether `role`'s type-level `signature` joins the type.
    fn include_type_method(&self, role: &RoleId, signature: &MethodSignature) -> bool {
        let _ = (role, signature);
        true
    }
}

/// A data-driven hook: excludes listed `(role, signature)` pairs.
#[derive(Debug, Clone, Default)]
pub struct DeclarativeVeto {
    excluded: HashSet<(RoleId, MethodSignature)>,
}

impl DeclarativeVeto {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude(mut self, role: impl Into<RoleId>, signature: MethodSignature) -> Self {
        self.excluded.insert((role.into(), signature));
        self
    }

    pub fn len(&self) -> usize {
        self.excluded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.excluded.is_empty()
    }

    fn includes(&self, role: &RoleId, signature: &MethodSignature) -> bool {
        !self.excluded.contains(&(role.clone(), signature.clone()))
    }
}

impl VetoHook for DeclarativeVeto {
    fn include_instance_method(&self, role: &RoleId, signature: &MethodSignature) -> bool {
        self.includes(role, signature)
    }

    fn include_type_method(&self, role: &RoleId, signature: &MethodSignature) -> bool {
        self.includes(role, signature)
    }
}

/// Closure adapter; the signature's level tells the two entry points apart.
pub struct FnVeto<F>(pub F);

impl<F> VetoHook for FnVeto<F>
where
    F: Fn(&RoleId, &MethodSignature) -> bool + Send + Sync,
{
    fn include_instance_method(&self, role: &RoleId, signature: &MethodSignature) -> bool {
        (self.0)(role, signature)
    }

    fn include_type_method(&self, role: &RoleId, signature: &MethodSignature) -> bool {
        (self.0)(role, signature)
    }
}

/// One role's offer for a signature.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Role whose provided methods define the body.
    pub origin: RoleId,
    /// Declared role through which the body arrived.
    pub via: RoleId,
    pub implementation: Implementation,
}

/// Outcome of resolving one signature.
#[derive(Debug, Clone)]
pub enum Decision {
    Select(Candidate),
    Omit,
    Ambiguous(Vec<Candidate>),
}

/// Apply `ty`'s veto hook to each candidate and decide the signature.
pub fn resolve(
    ty: &AdoptingType,
    signature: &MethodSignature,
    candidates: Vec<Candidate>,
) -> Decision {
    let mut survivors: Vec<Candidate> = match ty.veto() {
        None => candidates,
        Some(hook) => candidates
            .into_iter()
            .filter(|c| {
                let include = match signature.level() {
                    MethodLevel::Instance => hook.include_instance_method(&c.origin, signature),
                    MethodLevel::Type => hook.include_type_method(&c.origin, signature),
                };
                if !include {
                    obs::emit_candidate_vetoed(
                        ty.name(),
                        c.origin.as_str(),
                        &signature.to_string(),
                    );
                }
                include
            })
            .collect(),
    };

    if survivors.len() > 1 {
        return Decision::Ambiguous(survivors);
    }
    match survivors.pop() {
        Some(only) => Decision::Select(only),
        None => Decision::Omit,
    }
}
