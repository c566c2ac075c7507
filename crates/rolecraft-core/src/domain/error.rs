//! Error taxonomy for role registration, composition and dispatch.

use serde::{Deserialize, Serialize};

use crate::domain::role::RoleId;
use crate::domain::signature::MethodSignature;

/// A required capability nobody in the adoption set supplies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingCapability {
    pub signature: MethodSignature,
    /// Roles whose `requiredCapabilities` name the signature, sorted.
    pub required_by: Vec<RoleId>,
}

impl std::fmt::Display for MissingCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (required by {})",
            self.signature,
            join(&self.required_by)
        )
    }
}

/// A signature that still has two or more candidate providers after
/// own-method precedence and veto resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureConflict {
    pub signature: MethodSignature,
    /// Contending origin roles, sorted.
    pub roles: Vec<RoleId>,
}

impl std::fmt::Display for SignatureConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} provided by {}", self.signature, join(&self.roles))
    }
}

/// Errors produced while registering roles or composing adopting types.
///
/// `Clone` because a failed composition is cached and handed to every later
/// caller of `compose` for the same type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositionError {
    #[error("unknown role: {role}")]
    UnknownRole { role: RoleId },

    #[error("role already registered: {role}")]
    DuplicateRole { role: RoleId },

    #[error("role composition cycle: {}", join_path(.cycle))]
    RoleCycle { cycle: Vec<RoleId> },

    #[error("type {type_name} is missing required capabilities: {}", join(.missing))]
    MissingCapability {
        type_name: String,
        missing: Vec<MissingCapability>,
    },

    #[error("unresolved role conflicts in {owner}: {}", join(.conflicts))]
    RoleConflict {
        /// `type <name>`: conflicts are only ever settled by the adopting type.
        owner: String,
        conflicts: Vec<SignatureConflict>,
    },

    #[error("role {role} declares storage {fields:?}; roles cannot extend storage")]
    StorageExtension { role: RoleId, fields: Vec<String> },

    #[error("invalid role definition {role}: {reason}")]
    InvalidRoleDefinition { role: RoleId, reason: String },

    #[error("invalid method signature {input:?}: {reason}")]
    InvalidSignature { input: String, reason: String },

    #[error("type already declared: {type_name}")]
    DuplicateType { type_name: String },

    #[error("unknown type: {type_name}")]
    UnknownType { type_name: String },

    #[error("type {type_name} re-entered its own composition")]
    ReentrantComposition { type_name: String },

    /// The merge panicked, typically inside a veto hook or a catalog
    /// callback. Published like any other failure so the merge never reruns.
    #[error("composition of {owner} panicked: {message}")]
    CompositionPanicked { owner: String, message: String },

    #[error("type arena is full: no index left after {max_index}")]
    TypeArenaFull { max_index: u32 },

    #[error("no implementation bound for {signature} on {owner}")]
    UnboundImplementation {
        owner: String,
        signature: MethodSignature,
    },

    #[error("invalid configuration value {value:?} for {key}")]
    InvalidConfig { key: String, value: String },

    #[error("manifest error: {0}")]
    Manifest(String),
}

/// Result type for registration and composition.
pub type CompositionResult<T> = std::result::Result<T, CompositionError>;

/// Errors produced when invoking a method through a type's effective table.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("type {type_name} has not been composed; the lifecycle trigger must run first")]
    NotComposed { type_name: String },

    #[error("type {type_name} failed composition and is unusable: {source}")]
    Unusable {
        type_name: String,
        #[source]
        source: CompositionError,
    },

    #[error("type {type_name} has no method {signature}")]
    MethodNotFound {
        type_name: String,
        signature: MethodSignature,
    },

    #[error("method {signature} on {type_name} failed: {source}")]
    Method {
        type_name: String,
        signature: MethodSignature,
        #[source]
        source: anyhow::Error,
    },
}

/// Result type for method dispatch.
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// A composition failure surfaced by the lifecycle adapter.
///
/// The type must not run with role-provided behavior active.
#[derive(Debug, Clone, thiserror::Error)]
#[error("fatal: type {type_name} cannot be used with role-provided behavior: {source}")]
pub struct FatalCompositionError {
    pub type_name: String,
    #[source]
    pub source: CompositionError,
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_path(items: &[RoleId]) -> String {
    items
        .iter()
        .map(RoleId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
