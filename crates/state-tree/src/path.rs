//! Path resolver.
//!
//! Every node caches its pointer path from the tree root. The cache is only
//! rewritten by structural operations, which refresh the moved children and
//! their subtrees before any listener runs, so reads never walk the tree.

use state_tree_pointer::{append_index, append_key};

use crate::error::TreeResult;
use crate::node::{ChildKey, Content, NodeId, ParentLink};
use crate::store::Store;

impl Store {
    /// Pointer path of `id` from its tree root (`""` for a root).
    pub fn get_path(&self, id: NodeId) -> TreeResult<String> {
        Ok(self.node(id)?.path.clone())
    }

    fn compute_path(&self, id: NodeId) -> String {
        let Some(link) = self.nodes.get(&id).and_then(|d| d.parent.as_ref()) else {
            return String::new();
        };
        let base = self.nodes.get(&link.node).map(|d| d.path.as_str()).unwrap_or_default();
        match &link.key {
            ChildKey::Index(i) => append_index(base, *i),
            ChildKey::Key(k) => append_key(base, k),
        }
    }

    /// Recomputes the cached path of `id` and of its whole subtree.
    pub(crate) fn refresh_paths(&mut self, id: NodeId) {
        for node in self.subtree(id) {
            let path = self.compute_path(node);
            if let Some(data) = self.nodes.get_mut(&node) {
                data.path = path;
            }
        }
    }

    /// Rewrites parent links of the array children in `from..to` and
    /// refreshes their paths.
    pub(crate) fn reindex_children(&mut self, array: NodeId, from: usize, to: usize) {
        let children = match self.nodes.get(&array).map(|d| &d.content) {
            Some(Content::Array(items)) => {
                items[from.min(items.len())..to.min(items.len())].to_vec()
            }
            _ => return,
        };
        for (offset, child) in children.into_iter().enumerate() {
            let key = ChildKey::Index(from + offset);
            if let Some(data) = self.nodes.get_mut(&child) {
                data.parent = Some(ParentLink { node: array, key });
            }
            self.refresh_paths(child);
        }
    }
}
