//! JSON codec for patches.
//!
//! Converts patches to/from `serde_json::Value` in the wire format
//! `{op, path, value?}`.

use serde_json::{json, Value};

use super::types::Patch;
use crate::error::TreeError;

fn invalid(msg: &str) -> TreeError {
    TreeError::InvalidPatch(msg.to_string())
}

/// Serialize a patch to its wire form.
pub fn to_json(patch: &Patch) -> Value {
    match patch {
        Patch::Add { path, value } => json!({ "op": "add", "path": path, "value": value }),
        Patch::Replace { path, value } => json!({ "op": "replace", "path": path, "value": value }),
        Patch::Remove { path } => json!({ "op": "remove", "path": path }),
    }
}

/// Deserialize a patch from its wire form.
///
/// `add` and `replace` require a `value`; unknown operations are rejected.
pub fn from_json(v: &Value) -> Result<Patch, TreeError> {
    let obj = v.as_object().ok_or_else(|| invalid("patch must be an object"))?;
    let op = obj
        .get("op")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("op must be a string"))?;
    let path = obj
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("path must be a string"))?
        .to_string();
    let value = || {
        obj.get("value")
            .cloned()
            .ok_or_else(|| TreeError::InvalidPatch(format!("{op} requires a value")))
    };
    match op {
        "add" => Ok(Patch::Add { path, value: value()? }),
        "replace" => Ok(Patch::Replace { path, value: value()? }),
        "remove" => Ok(Patch::Remove { path }),
        other => Err(TreeError::InvalidPatch(format!("unknown op: {other}"))),
    }
}

/// Serialize a batch, preserving order.
pub fn to_json_patch(patches: &[Patch]) -> Value {
    Value::Array(patches.iter().map(to_json).collect())
}

/// Deserialize a batch, preserving order.
pub fn from_json_patch(v: &Value) -> Result<Vec<Patch>, TreeError> {
    v.as_array()
        .ok_or_else(|| invalid("patch batch must be an array"))?
        .iter()
        .map(from_json)
        .collect()
}
