//! JSON-Patch style partial updates.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::json::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOperation {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub op: PatchOperation,
    /// JSON-Pointer-like target, "/" addresses the whole resource.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Patch {
    pub fn new(op: PatchOperation, path: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            op,
            path: path.into(),
            value,
        }
    }

    /// `replace` patch whose value is any serializable record, usually a
    /// partial `Plan`.
    pub fn replace<T: Serialize>(path: impl Into<String>, value: &T) -> Result<Self, ParseError> {
        let value = serde_json::to_value(value).map_err(|source| ParseError {
            resource: "Patch",
            source,
        })?;
        Ok(Self::new(PatchOperation::Replace, path, Some(value)))
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self::new(PatchOperation::Remove, path, None)
    }
}

/// Ordered batch of patches, applied atomically by the service.
///
/// Serialized as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchRequest(Vec<Patch>);

impl PatchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, patch: Patch) {
        self.0.push(patch);
    }

    pub fn with(mut self, patch: Patch) -> Self {
        self.0.push(patch);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Patch> {
        self.0.iter()
    }
}

impl From<Vec<Patch>> for PatchRequest {
    fn from(patches: Vec<Patch>) -> Self {
        Self(patches)
    }
}

impl FromIterator<Patch> for PatchRequest {
    fn from_iter<I: IntoIterator<Item = Patch>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for PatchRequest {
    type Item = Patch;
    type IntoIter = std::vec::IntoIter<Patch>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PatchRequest {
    type Item = &'a Patch;
    type IntoIter = std::slice::Iter<'a, Patch>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
