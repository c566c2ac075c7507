//! Composition reports for operators and the CLI.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{CompositionState, MethodSignature, Provider, RoleId};

/// Serializable summary of one type's composition.
#[derive(Debug, Clone, Serialize)]
pub struct CompositionReport {
    pub type_name: String,
    pub state: CompositionState,
    pub declared_roles: Vec<RoleId>,
    /// When the merge settled, successfully or not.
    pub settled_at: Option<DateTime<Utc>>,
    pub methods: Vec<ReportEntry>,
    pub digest: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub signature: MethodSignature,
    pub provider: Provider,
    pub implementation: String,
}

impl CompositionReport {
    pub fn is_failed(&self) -> bool {
        self.state == CompositionState::Failed
    }

    /// Human-readable rendering, one method per line.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} [{}]", self.type_name, self.state);
        if !self.declared_roles.is_empty() {
            let roles: Vec<&str> = self.declared_roles.iter().map(RoleId::as_str).collect();
            let _ = writeln!(out, "  roles: {}", roles.join(", "));
        }
        for entry in &self.methods {
            let _ = writeln!(out, "  {:<24} {}", entry.signature, entry.provider);
        }
        if let Some(digest) = &self.digest {
            let _ = writeln!(out, "  digest: {}", &digest[..digest.len().min(16)]);
        }
        if let Some(error) = &self.error {
            let _ = writeln!(out, "  error: {error}");
        }
        out
    }
}
