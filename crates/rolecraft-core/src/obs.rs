//! Structured observability hooks for registration and composition.
//!
//! This module provides:
//! - Type-scoped tracing spans via `CompositionSpan` RAII guard
//! - Emission functions for key events: registration, composition start and
//!   finish, conflicts, vetoes and fatal lifecycle failures
//!
//! Events are emitted at `info!`/`debug!` level; failures at `warn!` and
//! `error!`. For JSON output, initialise tracing with `json = true`.

use tracing::{debug, error, info, warn};

/// RAII guard that enters a type-scoped span for the duration of a composition.
///
/// # Example
///
/// ```ignore
/// let _span = CompositionSpan::enter("Person");
/// // every event below is tagged with type_name = "Person"
/// ```
pub struct CompositionSpan {
    _span: tracing::span::EnteredSpan,
}

impl CompositionSpan {
    pub fn enter(type_name: &str) -> Self {
        let span = tracing::info_span!("rolecraft.compose", type_name = %type_name);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a role definition entered the registry.
pub fn emit_role_registered(role: &str, provided: usize, required: usize) {
    debug!(
        event = "registry.registered",
        role = %role,
        provided = provided,
        required = required,
    );
}

/// Emit event: the registry was frozen with `roles` definitions.
pub fn emit_registry_frozen(roles: usize) {
    info!(event = "registry.frozen", roles = roles);
}

/// Emit event: composition of a type started.
pub fn emit_composition_started(type_name: &str, declared_roles: usize) {
    info!(
        event = "composition.started",
        type_name = %type_name,
        declared_roles = declared_roles,
    );
}

/// Emit event: composition succeeded with `methods` effective entries.
pub fn emit_composition_finished(type_name: &str, methods: usize, digest: &str) {
    info!(
        event = "composition.finished",
        type_name = %type_name,
        methods = methods,
        digest = %digest,
    );
}

/// Emit event: composition failed (warning level).
pub fn emit_composition_failed(type_name: &str, error: &dyn std::fmt::Display) {
    warn!(event = "composition.failed", type_name = %type_name, error = %error);
}

/// Emit event: a signature kept two or more providers after veto resolution.
pub fn emit_conflict_detected(owner: &str, signature: &str, roles: &[String]) {
    warn!(
        event = "composition.conflict",
        owner = %owner,
        signature = %signature,
        roles = ?roles,
    );
}

/// Emit event: a veto hook excluded one role's candidate.
pub fn emit_candidate_vetoed(type_name: &str, role: &str, signature: &str) {
    debug!(
        event = "composition.vetoed",
        type_name = %type_name,
        role = %role,
        signature = %signature,
    );
}

/// Emit event: the lifecycle trigger surfaced a fatal composition error.
pub fn emit_composition_fatal(type_name: &str, error: &dyn std::fmt::Display) {
    error!(event = "composition.fatal", type_name = %type_name, error = %error);
}
