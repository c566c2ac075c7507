//! Composition engine: one-shot, per-type merge of role-provided methods.
//!
//! Types live in an arena indexed by [`TypeIndex`] and by name. Each entry
//! owns a one-shot slot; the first `compose` call runs the merge, racing
//! callers block until it settles, and every later call returns the cached
//! table or the cached error.
//!
//! Merge order for one type:
//! 1. resolve declared roles and their composed roles, dependencies first
//!    (unknown roles and cycles fail here)
//! 2. storage check, when deferred to composition
//! 3. capability validation over the whole adoption set
//! 4. candidate collection from each declared role's closure, one per
//!    origin role however deep, skipping signatures the type implements
//! 5. veto + conflict resolution per signature
//! 6. install own methods and resolved role methods as the effective table

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;

use crate::config::{ComposerConfig, StorageCheck};
use crate::domain::{
    AdoptingType, CompositionError, CompositionResult, CompositionState, DispatchError,
    DispatchResult, MethodEntry, MethodSignature, MethodTable, Provider, RoleId,
    SignatureConflict,
};
use crate::linearize;
use crate::metrics::EngineMetrics;
use crate::obs::{self, CompositionSpan};
use crate::registry::RoleRegistry;
use crate::report::{CompositionReport, ReportEntry};
use crate::resolver::{self, Candidate, Decision};
use crate::slot::OneShot;
use crate::validator;

/// Dense arena index of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeIndex(pub u32);

impl TypeIndex {
    /// Index for the entry appended after `len` existing ones.
    fn next(len: usize) -> CompositionResult<Self> {
        u32::try_from(len)
            .map(TypeIndex)
            .map_err(|_| CompositionError::TypeArenaFull { max_index: u32::MAX })
    }
}

struct TypeEntry {
    index: TypeIndex,
    definition: AdoptingType,
    slot: OneShot<MethodTable>,
    settled_at: OnceLock<DateTime<Utc>>,
}

/// Cheap, cloneable reference to a declared type.
#[derive(Clone)]
pub struct TypeHandle(Arc<TypeEntry>);

impl TypeHandle {
    pub fn index(&self) -> TypeIndex {
        self.0.index
    }

    pub fn name(&self) -> &str {
        self.0.definition.name()
    }

    pub fn definition(&self) -> &AdoptingType {
        &self.0.definition
    }
}

impl std::fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeHandle")
            .field("index", &self.0.index)
            .field("name", &self.name())
            .finish()
    }
}

#[derive(Default)]
struct TypeArena {
    slots: Vec<TypeHandle>,
    by_name: HashMap<String, TypeIndex>,
}

/// Builds and caches effective method tables for adopting types.
pub struct CompositionEngine {
    registry: Arc<RoleRegistry>,
    config: ComposerConfig,
    arena: RwLock<TypeArena>,
    metrics: EngineMetrics,
}

impl CompositionEngine {
    pub fn new(registry: Arc<RoleRegistry>, config: ComposerConfig) -> Self {
        Self {
            registry,
            config,
            arena: RwLock::new(TypeArena::default()),
            metrics: EngineMetrics::new(),
        }
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Record an adopting type. It starts `Uncomposed`.
    ///
    /// Role references are not checked here; composition reports unknown
    /// roles so that declaration stays independent of registration order.
    pub fn declare(&self, definition: AdoptingType) -> CompositionResult<TypeHandle> {
        let mut arena = self.arena.write();
        if arena.by_name.contains_key(definition.name()) {
            return Err(CompositionError::DuplicateType {
                type_name: definition.name().to_string(),
            });
        }

        let index = TypeIndex::next(arena.slots.len())?;
        let name = definition.name().to_string();
        let handle = TypeHandle(Arc::new(TypeEntry {
            index,
            definition,
            slot: OneShot::new(),
            settled_at: OnceLock::new(),
        }));
        arena.slots.push(handle.clone());
        arena.by_name.insert(name, index);
        Ok(handle)
    }

    pub fn handle(&self, type_name: &str) -> CompositionResult<TypeHandle> {
        let arena = self.arena.read();
        arena
            .by_name
            .get(type_name)
            .and_then(|idx| arena.slots.get(idx.0 as usize))
            .cloned()
            .ok_or_else(|| CompositionError::UnknownType {
                type_name: type_name.to_string(),
            })
    }

    pub fn handle_at(&self, index: TypeIndex) -> Option<TypeHandle> {
        self.arena.read().slots.get(index.0 as usize).cloned()
    }

    /// Every declared type, in declaration order.
    pub fn handles(&self) -> Vec<TypeHandle> {
        self.arena.read().slots.clone()
    }

    /// Compose `handle`'s type, or return the cached outcome.
    ///
    /// The merge runs at most once per type, however many threads race
    /// here. A `Failed` type stays failed for the life of the engine; a
    /// merge that panics leaves the type `Failed` with
    /// [`CompositionError::CompositionPanicked`] and the panic propagates to
    /// the caller that ran it.
    pub fn compose(&self, handle: &TypeHandle) -> CompositionResult<Arc<MethodTable>> {
        let entry = &handle.0;
        entry.slot.run_once(
            || self.merge(entry),
            || CompositionError::ReentrantComposition {
                type_name: entry.definition.name().to_string(),
            },
            |message| {
                let err = CompositionError::CompositionPanicked {
                    owner: format!("type {}", entry.definition.name()),
                    message,
                };
                self.metrics.inc_failures();
                obs::emit_composition_failed(entry.definition.name(), &err);
                let _ = entry.settled_at.set(Utc::now());
                err
            },
        )
    }

    pub fn state(&self, handle: &TypeHandle) -> CompositionState {
        handle.0.slot.state()
    }

    /// The effective table, present only once the type is `Composed`.
    pub fn effective_methods(&self, handle: &TypeHandle) -> Option<Arc<MethodTable>> {
        match handle.0.slot.outcome() {
            Some(Ok(table)) => Some(Arc::clone(table)),
            _ => None,
        }
    }

    /// The settled outcome, or `None` while `Uncomposed`/`Composing`.
    pub fn outcome(&self, handle: &TypeHandle) -> Option<CompositionResult<Arc<MethodTable>>> {
        handle.0.slot.outcome().cloned()
    }

    /// Invoke a method through the type's effective table.
    ///
    /// Never triggers composition: the lifecycle trigger has to run first.
    pub fn dispatch(
        &self,
        handle: &TypeHandle,
        signature: &MethodSignature,
        receiver: &Value,
        args: &[Value],
    ) -> DispatchResult<Value> {
        match handle.0.slot.outcome() {
            None => Err(DispatchError::NotComposed {
                type_name: handle.name().to_string(),
            }),
            Some(Err(source)) => Err(DispatchError::Unusable {
                type_name: handle.name().to_string(),
                source: source.clone(),
            }),
            Some(Ok(table)) => table.invoke(signature, receiver, args),
        }
    }

    pub fn report(&self, handle: &TypeHandle) -> CompositionReport {
        let entry = &handle.0;
        let mut report = CompositionReport {
            type_name: entry.definition.name().to_string(),
            state: entry.slot.state(),
            declared_roles: entry.definition.declared_roles().to_vec(),
            settled_at: entry.settled_at.get().copied(),
            methods: Vec::new(),
            digest: None,
            error: None,
        };
        match entry.slot.outcome() {
            Some(Ok(table)) => {
                report.methods = table
                    .iter()
                    .map(|(sig, e)| ReportEntry {
                        signature: sig.clone(),
                        provider: e.provider.clone(),
                        implementation: e.implementation.label().to_string(),
                    })
                    .collect();
                report.digest = Some(table.digest());
            }
            Some(Err(err)) => report.error = Some(err.to_string()),
            None => {}
        }
        report
    }

    fn merge(&self, entry: &TypeEntry) -> CompositionResult<MethodTable> {
        let ty = &entry.definition;
        let _span = CompositionSpan::enter(ty.name());
        self.metrics.inc_merges();
        obs::emit_composition_started(ty.name(), ty.declared_roles().len());

        let result = self.merge_table(ty);
        match &result {
            Ok(table) => obs::emit_composition_finished(ty.name(), table.len(), &table.digest()),
            Err(err) => {
                self.metrics.inc_failures();
                obs::emit_composition_failed(ty.name(), err);
            }
        }
        let _ = entry.settled_at.set(Utc::now());
        result
    }

    fn merge_table(&self, ty: &AdoptingType) -> CompositionResult<MethodTable> {
        let order = linearize::resolution_order(&self.registry, ty.declared_roles())?;

        if self.config.storage_check == StorageCheck::AtComposition {
            for role in &order {
                role.check_storage()?;
            }
        }

        validator::validate(ty, &order)?;

        // Dependencies first, so every closure below is already settled.
        for role in &order {
            self.registry.closure_resolved(role.id())?;
        }

        let mut candidates: BTreeMap<MethodSignature, Vec<Candidate>> = BTreeMap::new();
        for via in ty.declared_roles() {
            let closure = self.registry.closure_resolved(via)?;
            for (sig, offered) in closure.methods() {
                if ty.owns(sig) {
                    continue;
                }
                let slot = candidates.entry(sig.clone()).or_default();
                for entry in offered {
                    if slot.iter().any(|c| c.origin == entry.origin) {
                        continue;
                    }
                    slot.push(Candidate {
                        origin: entry.origin.clone(),
                        via: via.clone(),
                        implementation: entry.implementation.clone(),
                    });
                }
            }
        }

        let mut table = MethodTable::new(ty.name());
        for (sig, implementation) in ty.own_methods() {
            table.insert(
                sig.clone(),
                MethodEntry {
                    implementation: implementation.clone(),
                    provider: Provider::Own,
                },
            );
        }

        let owner = format!("type {}", ty.name());
        let mut conflicts = Vec::new();
        let mut vetoed = 0u64;
        for (sig, offered) in candidates {
            let offered_count = offered.len();
            match resolver::resolve(ty, &sig, offered) {
                Decision::Select(chosen) => {
                    vetoed += (offered_count - 1) as u64;
                    table.insert(
                        sig,
                        MethodEntry {
                            implementation: chosen.implementation,
                            provider: Provider::Role {
                                origin: chosen.origin,
                                via: chosen.via,
                            },
                        },
                    );
                }
                Decision::Omit => vetoed += offered_count as u64,
                Decision::Ambiguous(survivors) => {
                    vetoed += (offered_count - survivors.len()) as u64;
                    let mut roles: Vec<RoleId> = survivors.into_iter().map(|c| c.origin).collect();
                    roles.sort();
                    let names: Vec<String> = roles.iter().map(ToString::to_string).collect();
                    obs::emit_conflict_detected(&owner, &sig.to_string(), &names);
                    conflicts.push(SignatureConflict {
                        signature: sig,
                        roles,
                    });
                }
            }
        }
        self.metrics.add_vetoed(vetoed);

        if !conflicts.is_empty() {
            self.metrics.add_conflicts(conflicts.len() as u64);
            return Err(CompositionError::RoleConflict { owner, conflicts });
        }

        Ok(table)
    }
}

impl std::fmt::Debug for CompositionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositionEngine")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("types", &self.arena.read().slots.len())
            .finish()
    }
}
