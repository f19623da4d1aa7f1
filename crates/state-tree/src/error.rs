//! Error type shared by every store operation.

use state_tree_pointer::PointerError;
use thiserror::Error;

use crate::node::NodeId;
use crate::types::Identifier;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TreeError {
    /// A value does not satisfy the type of the slot it is written to.
    #[error("TYPE_MISMATCH: expected {expected}, got {value}")]
    TypeMismatch { expected: String, value: String },
    /// A path or index does not resolve to a live container slot.
    #[error("PATH_RESOLUTION: {path}")]
    PathResolution { path: String },
    /// Two live nodes of one type would share an identifier in one tree.
    #[error("IDENTIFIER_CONFLICT: {type_name} {identifier}")]
    IdentifierConflict { type_name: String, identifier: Identifier },
    /// An in-place update would change the identifier of a live node.
    #[error("IDENTIFIER_IMMUTABLE: {type_name} {from} -> {to}")]
    IdentifierImmutable { type_name: String, from: Identifier, to: Identifier },
    /// A node candidate already has a parent, appears twice, or would be
    /// inserted below itself.
    #[error("ALREADY_ATTACHED: {0}")]
    AlreadyAttached(NodeId),
    #[error("UNKNOWN_NODE: {0}")]
    UnknownNode(NodeId),
    #[error("NOT_A_CONTAINER: {node} is a {kind}")]
    NotAContainer { node: NodeId, kind: &'static str },
    #[error("INVALID_PATCH: {0}")]
    InvalidPatch(String),
}

impl TreeError {
    pub(crate) fn type_mismatch(expected: String, value: &serde_json::Value) -> Self {
        TreeError::TypeMismatch { expected, value: value.to_string() }
    }

    pub(crate) fn path(path: impl Into<String>) -> Self {
        TreeError::PathResolution { path: path.into() }
    }

    pub(crate) fn from_pointer(path: &str, err: PointerError) -> Self {
        match err {
            PointerError::PointerInvalid(_) | PointerError::PointerTooDeep => {
                TreeError::InvalidPatch(format!("{err}"))
            }
            PointerError::InvalidIndex(_) | PointerError::IndexOutOfBounds { .. } => {
                TreeError::path(path)
            }
        }
    }
}

pub type TreeResult<T> = Result<T, TreeError>;
