//! Node identity and per-node bookkeeping.

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use crate::types::{Identifier, TypeRef};

/// Stable identity of a live node. Ids are never reused within a store, so a
/// stale id can never alias a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of a node inside its parent container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildKey {
    Index(usize),
    Key(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParentLink {
    pub node: NodeId,
    pub key: ChildKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Scalar,
    Model,
    Array,
    Map,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Scalar => "scalar",
            NodeKind::Model => "model",
            NodeKind::Array => "array",
            NodeKind::Map => "map",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Content {
    Scalar(Value),
    Model(IndexMap<String, NodeId>),
    Array(Vec<NodeId>),
    Map(IndexMap<String, NodeId>),
}

impl Content {
    pub fn kind(&self) -> NodeKind {
        match self {
            Content::Scalar(_) => NodeKind::Scalar,
            Content::Model(_) => NodeKind::Model,
            Content::Array(_) => NodeKind::Array,
            Content::Map(_) => NodeKind::Map,
        }
    }

    /// Direct children with their keys, in container order.
    pub fn children(&self) -> Vec<(ChildKey, NodeId)> {
        match self {
            Content::Scalar(_) => Vec::new(),
            Content::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, id)| (ChildKey::Index(i), *id))
                .collect(),
            Content::Model(entries) | Content::Map(entries) => entries
                .iter()
                .map(|(k, id)| (ChildKey::Key(k.clone()), *id))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub ty: TypeRef,
    pub parent: Option<ParentLink>,
    pub identifier: Option<Identifier>,
    pub content: Content,
    /// Cached pointer path from the tree root.
    pub path: String,
}
