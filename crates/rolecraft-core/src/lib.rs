//! Rolecraft Core
//!
//! Runtime role composition: named bundles of required capabilities and
//! provided methods are merged into adopting types, once per type, with
//! explicit conflict detection and per-candidate veto hooks.
//!
//! ```ignore
//! let mut builder = RoleRegistry::builder();
//! builder.register(RoleDefinition::new("Greeter").provides(greet, body))?;
//! let engine = Arc::new(CompositionEngine::new(Arc::new(builder.freeze()), config));
//! let person = engine.declare(AdoptingType::new("Person").adopts("Greeter"))?;
//! let table = LifecycleAdapter::new(engine.clone()).on_first_use(&person)?;
//! ```

pub mod closure;
pub mod config;
pub mod domain;
pub mod engine;
pub mod lifecycle;
pub mod linearize;
pub mod manifest;
pub mod metrics;
pub mod obs;
pub mod registry;
pub mod report;
pub mod resolver;
mod slot;
pub mod telemetry;
pub mod validator;

pub use closure::{ClosureEntry, RoleClosure};
pub use config::{ComposerConfig, FailurePolicy, StorageCheck};
pub use domain::{
    AdoptingType, CompositionError, CompositionResult, CompositionState, DispatchError,
    DispatchResult, FatalCompositionError, Implementation, Invocation, MethodEntry, MethodFn,
    MethodLevel, MethodSignature, MethodTable, MissingCapability, Provider, RoleDefinition,
    RoleId, SignatureConflict,
};
pub use engine::{CompositionEngine, TypeHandle, TypeIndex};
pub use lifecycle::LifecycleAdapter;
pub use manifest::{Manifest, MethodCatalog, RoleDecl, TypeDecl, VetoDecl};
pub use metrics::EngineMetrics;
pub use registry::{RoleRegistry, RoleRegistryBuilder};
pub use report::{CompositionReport, ReportEntry};
pub use resolver::{Candidate, DeclarativeVeto, Decision, FnVeto, VetoHook};

/// Crate version, from Cargo metadata.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
