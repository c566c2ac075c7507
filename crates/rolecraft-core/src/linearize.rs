//! Topological resolution of role adoption sets.
//!
//! Roles form a directed graph through `composes` edges. An edge `A → B`
//! means "A adopts B": B's closure must exist before A's. Resolution is a
//! depth-first post-order walk, so every role appears after everything it
//! composes. A role met again while still on the DFS path closes a cycle.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::{CompositionError, CompositionResult, RoleDefinition, RoleId};
use crate::registry::RoleRegistry;

/// Resolve `roots` and everything they transitively compose.
///
/// Returns definitions dependencies-first, each exactly once.
///
/// # Errors
///
/// - [`CompositionError::UnknownRole`] for an unregistered identity.
/// - [`CompositionError::RoleCycle`] with the cycle path, first and last
///   element equal (`A -> B -> A`).
pub fn resolution_order(
    registry: &RoleRegistry,
    roots: &[RoleId],
) -> CompositionResult<Vec<Arc<RoleDefinition>>> {
    let mut walk = Walk {
        registry,
        path: Vec::new(),
        done: HashSet::new(),
        order: Vec::new(),
    };
    for root in roots {
        walk.visit(root)?;
    }
    Ok(walk.order)
}

struct Walk<'r> {
    registry: &'r RoleRegistry,
    path: Vec<RoleId>,
    done: HashSet<RoleId>,
    order: Vec<Arc<RoleDefinition>>,
}

impl Walk<'_> {
    fn visit(&mut self, id: &RoleId) -> CompositionResult<()> {
        if self.done.contains(id) {
            return Ok(());
        }
        if let Some(pos) = self.path.iter().position(|p| p == id) {
            let mut cycle = self.path[pos..].to_vec();
            cycle.push(id.clone());
            return Err(CompositionError::RoleCycle { cycle });
        }

        let definition = self.registry.lookup(id)?;
        self.path.push(id.clone());
        for dependency in definition.composed_roles() {
            self.visit(dependency)?;
        }
        self.path.pop();

        self.done.insert(id.clone());
        self.order.push(definition);
        Ok(())
    }
}
