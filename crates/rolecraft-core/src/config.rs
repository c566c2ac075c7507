//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::domain::{CompositionError, CompositionResult};

/// When role storage declarations are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageCheck {
    /// `register` rejects the role.
    #[default]
    AtRegistration,
    /// The role registers; any type whose adoption set contains it fails.
    AtComposition,
}

/// What the lifecycle adapter does with a fatal composition error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log and return the error to the host.
    #[default]
    Report,
    /// Log and abort the process.
    Abort,
}

/// Configuration shared by the registry builder, engine and lifecycle adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    pub storage_check: StorageCheck,
    pub failure_policy: FailurePolicy,
}

impl ComposerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_storage_check(mut self, check: StorageCheck) -> Self {
        self.storage_check = check;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Create from environment variables
    ///
    /// Reads:
    /// - ROLECRAFT_STORAGE_CHECK (optional, `registration` | `composition`,
    ///   default: `registration`)
    /// - ROLECRAFT_FAILURE_POLICY (optional, `report` | `abort`, default: `report`)
    pub fn from_env() -> CompositionResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CompositionResult<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup("ROLECRAFT_STORAGE_CHECK") {
            config.storage_check = match value.trim().to_lowercase().as_str() {
                "registration" => StorageCheck::AtRegistration,
                "composition" => StorageCheck::AtComposition,
                _ => {
                    return Err(CompositionError::InvalidConfig {
                        key: "ROLECRAFT_STORAGE_CHECK".to_string(),
                        value,
                    })
                }
            };
        }

        if let Some(value) = lookup("ROLECRAFT_FAILURE_POLICY") {
            config.failure_policy = match value.trim().to_lowercase().as_str() {
                "report" => FailurePolicy::Report,
                "abort" => FailurePolicy::Abort,
                _ => {
                    return Err(CompositionError::InvalidConfig {
                        key: "ROLECRAFT_FAILURE_POLICY".to_string(),
                        value,
                    })
                }
            };
        }

        Ok(config)
    }
}
