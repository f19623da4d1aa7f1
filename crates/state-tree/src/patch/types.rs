//! Structural patch type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One structural change, addressed by a pointer relative to the observed
/// node. Serializes as `{"op": "add" | "replace" | "remove", "path", "value"?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Patch {
    Add { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
}

impl Patch {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Patch::Add { path: path.into(), value }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Patch::Replace { path: path.into(), value }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Patch::Remove { path: path.into() }
    }

    pub fn op_name(&self) -> &'static str {
        match self {
            Patch::Add { .. } => "add",
            Patch::Replace { .. } => "replace",
            Patch::Remove { .. } => "remove",
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Patch::Add { path, .. } | Patch::Replace { path, .. } | Patch::Remove { path } => path,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Patch::Add { value, .. } | Patch::Replace { value, .. } => Some(value),
            Patch::Remove { .. } => None,
        }
    }

    /// Same operation addressed at `path`.
    pub fn with_path(&self, path: impl Into<String>) -> Self {
        let path = path.into();
        match self {
            Patch::Add { value, .. } => Patch::Add { path, value: value.clone() },
            Patch::Replace { value, .. } => Patch::Replace { path, value: value.clone() },
            Patch::Remove { .. } => Patch::Remove { path },
        }
    }
}
