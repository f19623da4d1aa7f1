//! Identifier index.
//!
//! Maps `(tree root, model type name, identifier)` to the single live node
//! holding that identifier. Scoping by root keeps independent trees of one
//! store from colliding.

use std::collections::HashMap;

use crate::node::NodeId;
use crate::types::Identifier;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ScopeKey {
    root: NodeId,
    type_name: String,
    identifier: Identifier,
}

#[derive(Debug, Default)]
pub(crate) struct IdentifierIndex {
    entries: HashMap<ScopeKey, NodeId>,
}

impl IdentifierIndex {
    fn key(root: NodeId, type_name: &str, identifier: &Identifier) -> ScopeKey {
        ScopeKey { root, type_name: type_name.to_string(), identifier: identifier.clone() }
    }

    pub fn get(&self, root: NodeId, type_name: &str, identifier: &Identifier) -> Option<NodeId> {
        self.entries.get(&Self::key(root, type_name, identifier)).copied()
    }

    pub fn insert(&mut self, root: NodeId, type_name: &str, identifier: &Identifier, node: NodeId) {
        self.entries.insert(Self::key(root, type_name, identifier), node);
    }

    /// Removes the entry only while `node` is still its holder.
    pub fn remove_if(
        &mut self,
        root: NodeId,
        type_name: &str,
        identifier: &Identifier,
        node: NodeId,
    ) -> bool {
        let key = Self::key(root, type_name, identifier);
        if self.entries.get(&key) == Some(&node) {
            self.entries.remove(&key);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
