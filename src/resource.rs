use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ReconcileError;

/// Attribute name to value, in the declared (snake_case) vocabulary.
pub type Attributes = serde_json::Map<String, Value>;

/// Separator between the parts of a composite identifier.
pub const ID_SEPARATOR: &str = ":";

/// Opaque key correlating a declared resource with its remote counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_parts(parts: &[&str]) -> Self {
        Self(parts.join(ID_SEPARATOR))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into exactly `expected` parts. A single-part identifier is
    /// returned whole, separators included.
    pub fn parts(&self, expected: usize) -> Result<Vec<&str>, ReconcileError> {
        if expected <= 1 {
            return if self.0.is_empty() {
                Err(self.malformed(expected))
            } else {
                Ok(vec![self.0.as_str()])
            };
        }
        let parts: Vec<&str> = self.0.split(ID_SEPARATOR).collect();
        if parts.len() != expected || parts.iter().any(|p| p.is_empty()) {
            return Err(self.malformed(expected));
        }
        Ok(parts)
    }

    fn malformed(&self, expected: usize) -> ReconcileError {
        ReconcileError::MalformedId {
            id: self.0.clone(),
            expected,
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Desired state for one resource instance as written in configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclaredResource {
    attributes: Attributes,
}

impl DeclaredResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_attributes(attributes: Attributes) -> Self {
        Self { attributes }
    }

    pub fn from_value(value: Value) -> Result<Self, ReconcileError> {
        match value {
            Value::Object(attributes) => Ok(Self { attributes }),
            other => Err(ReconcileError::Validation {
                resource_type: "declared resource".to_string(),
                message: format!("expected an object of attributes, got {}", other),
            }),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Value of `name` if it is set. Null and the empty string count as unset.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).filter(|v| is_set(v))
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

pub fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Identifier plus the attribute mapping refreshed from the remote side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResourceState {
    pub resource_type: String,
    pub id: ResourceId,
    pub attributes: Attributes,
}

impl ResourceState {
    pub fn new(resource_type: impl Into<String>, id: ResourceId, attributes: Attributes) -> Self {
        Self {
            resource_type: resource_type.into(),
            id,
            attributes,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).filter(|v| is_set(v))
    }
}
