//! The external first-use trigger.
//!
//! Hosts call [`LifecycleAdapter::on_first_use`] at their type's
//! initialization point. Repeat calls are cheap: the engine's one-shot slot
//! returns the cached outcome without re-merging.

use std::sync::Arc;

use crate::config::FailurePolicy;
use crate::domain::{FatalCompositionError, MethodTable};
use crate::engine::{CompositionEngine, TypeHandle};
use crate::obs;

/// Surfaces composition failures as fatal, per [`FailurePolicy`].
#[derive(Debug, Clone)]
pub struct LifecycleAdapter {
    engine: Arc<CompositionEngine>,
    policy: FailurePolicy,
}

impl LifecycleAdapter {
    /// Adapter using the engine's configured failure policy.
    pub fn new(engine: Arc<CompositionEngine>) -> Self {
        let policy = engine.config().failure_policy;
        Self { engine, policy }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn engine(&self) -> &Arc<CompositionEngine> {
        &self.engine
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Compose `handle`'s type if needed and return its effective table.
    ///
    /// A failure is logged at `error` level on every call. Under
    /// [`FailurePolicy::Abort`] the process then aborts.
    pub fn on_first_use(
        &self,
        handle: &TypeHandle,
    ) -> Result<Arc<MethodTable>, FatalCompositionError> {
        self.engine.compose(handle).map_err(|source| {
            let fatal = FatalCompositionError {
                type_name: handle.name().to_string(),
                source,
            };
            self.escalate(&fatal);
            fatal
        })
    }

    /// Like [`on_first_use`](Self::on_first_use), looking the type up by name.
    pub fn on_first_use_by_name(
        &self,
        type_name: &str,
    ) -> Result<Arc<MethodTable>, FatalCompositionError> {
        match self.engine.handle(type_name) {
            Ok(handle) => self.on_first_use(&handle),
            Err(source) => {
                let fatal = FatalCompositionError {
                    type_name: type_name.to_string(),
                    source,
                };
                self.escalate(&fatal);
                Err(fatal)
            }
        }
    }

    /// Trigger every declared type, in declaration order.
    ///
    /// Returns every fatal error rather than stopping at the first.
    pub fn ensure_all(&self) -> Vec<FatalCompositionError> {
        self.engine
            .handles()
            .iter()
            .filter_map(|handle| self.on_first_use(handle).err())
            .collect()
    }

    fn escalate(&self, fatal: &FatalCompositionError) {
        obs::emit_composition_fatal(&fatal.type_name, &fatal.source);
        if self.policy == FailurePolicy::Abort {
            std::process::abort();
        }
    }
}
