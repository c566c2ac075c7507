//! Method signatures and their dispatch level.

use serde::{Deserialize, Serialize};

use crate::domain::error::{CompositionError, CompositionResult};

/// Textual prefix marking a type-level signature, e.g. `type::shared`.
pub const TYPE_LEVEL_PREFIX: &str = "type::";

/// Whether a method is invoked on instances or on the type itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodLevel {
    Instance,
    Type,
}

impl std::fmt::Display for MethodLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MethodLevel::Instance => "instance",
            MethodLevel::Type => "type",
        };
        write!(f, "{s}")
    }
}

/// A method identity: its name plus its level.
///
/// `greet` and `type::greet` are distinct signatures and never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MethodSignature {
    level: MethodLevel,
    name: String,
}

impl MethodSignature {
    /// An instance-level signature.
    pub fn instance(name: impl Into<String>) -> Self {
        Self {
            level: MethodLevel::Instance,
            name: name.into(),
        }
    }

    /// A type-level signature.
    pub fn type_level(name: impl Into<String>) -> Self {
        Self {
            level: MethodLevel::Type,
            name: name.into(),
        }
    }

    /// Parse the textual form: a bare name is instance-level, a
    /// [`TYPE_LEVEL_PREFIX`] marks a type-level method.
    pub fn parse(input: &str) -> CompositionResult<Self> {
        let trimmed = input.trim();
        let (level, name) = match trimmed.strip_prefix(TYPE_LEVEL_PREFIX) {
            Some(rest) => (MethodLevel::Type, rest),
            None => (MethodLevel::Instance, trimmed),
        };

        if name.is_empty() {
            return Err(CompositionError::InvalidSignature {
                input: input.to_string(),
                reason: "method name is empty".to_string(),
            });
        }
        if name.chars().any(char::is_whitespace) {
            return Err(CompositionError::InvalidSignature {
                input: input.to_string(),
                reason: "method name contains whitespace".to_string(),
            });
        }

        Ok(Self {
            level,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> MethodLevel {
        self.level
    }

    pub fn is_type_level(&self) -> bool {
        self.level == MethodLevel::Type
    }
}

impl std::fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.level {
            MethodLevel::Instance => write!(f, "{}", self.name),
            MethodLevel::Type => write!(f, "{TYPE_LEVEL_PREFIX}{}", self.name),
        }
    }
}

impl std::str::FromStr for MethodSignature {
    type Err = CompositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MethodSignature {
    type Error = CompositionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MethodSignature> for String {
    fn from(value: MethodSignature) -> Self {
        value.to_string()
    }
}
