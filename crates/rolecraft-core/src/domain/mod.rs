//! Domain types for role composition.

pub mod adopting;
pub mod error;
pub mod role;
pub mod signature;
pub mod table;

pub use adopting::{AdoptingType, CompositionState};
pub use error::{
    CompositionError, CompositionResult, DispatchError, DispatchResult, FatalCompositionError,
    MissingCapability, SignatureConflict,
};
pub use role::{Implementation, MethodFn, RoleDefinition, RoleId};
pub use signature::{MethodLevel, MethodSignature, TYPE_LEVEL_PREFIX};
pub use table::{Invocation, MethodEntry, MethodTable, Provider};
