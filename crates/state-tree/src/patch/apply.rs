//! Applying patches onto a subtree.
//!
//! Paths are resolved relative to the node the patch is applied to. Every
//! patch becomes one of the regular store operations, so reconciliation,
//! validation and listener notification behave exactly as for direct calls.

use serde_json::Value;
use state_tree_pointer::{parse_index, parse_pointer};

use super::types::Patch;
use crate::error::{TreeError, TreeResult};
use crate::node::{Content, NodeId, NodeKind};
use crate::store::Store;

impl Store {
    /// Applies one patch. `patch.path` is relative to `node`.
    ///
    /// - `add`: inserts into an array (`-` appends), writes a map entry or
    ///   reconciles a model field.
    /// - `replace`: reconciles an array slot (`len` appends), map entry or
    ///   model field.
    /// - `remove`: deletes an array slot or map entry.
    ///
    /// The empty path addresses `node` itself, which can be replaced (its
    /// snapshot is applied) but never removed.
    pub fn apply_patch(&mut self, node: NodeId, patch: &Patch) -> TreeResult<()> {
        let path = patch.path();
        let segments = parse_pointer(path).map_err(|e| TreeError::from_pointer(path, e))?;
        let Some((last, parents)) = segments.split_last() else {
            return match patch.value() {
                Some(value) => self.apply_snapshot(node, value.clone()),
                None => Err(TreeError::InvalidPatch(format!("cannot remove the root of {node}"))),
            };
        };
        let mut target = node;
        for segment in parents {
            target = self.child_at(target, segment, path)?;
        }
        tracing::trace!(node = %node, op = patch.op_name(), path, "applying patch");

        match (self.kind(target)?, patch) {
            (NodeKind::Array, Patch::Add { value, .. }) => {
                let index = self.patch_index(target, last, path, true)?;
                self.splice(target, index, 0, [value.clone()]).map(|_| ())
            }
            // Replacing the slot just past the end appends.
            (NodeKind::Array, Patch::Replace { value, .. }) => {
                let index = self.patch_index(target, last, path, true)?;
                self.set_index(target, index, value.clone()).map(|_| ())
            }
            (NodeKind::Array, Patch::Remove { .. }) => {
                let index = self.patch_index(target, last, path, false)?;
                self.splice(target, index, 1, Vec::<Value>::new()).map(|_| ())
            }
            (NodeKind::Map, Patch::Add { value, .. } | Patch::Replace { value, .. }) => {
                self.map_put(target, last, value.clone()).map(|_| ())
            }
            (NodeKind::Map, Patch::Remove { .. }) => self.map_delete(target, last),
            (NodeKind::Model, Patch::Add { value, .. } | Patch::Replace { value, .. }) => {
                let field = self.child_at(target, last, path)?;
                self.apply_snapshot(field, value.clone())
            }
            (NodeKind::Model, Patch::Remove { .. }) => {
                Err(TreeError::InvalidPatch(format!("cannot remove model field {path}")))
            }
            (NodeKind::Scalar, _) => Err(TreeError::path(path)),
        }
    }

    /// Applies patches in order, stopping at the first failure. Patches
    /// before the failing one stay applied.
    pub fn apply_patches<'a>(
        &mut self,
        node: NodeId,
        patches: impl IntoIterator<Item = &'a Patch>,
    ) -> TreeResult<()> {
        for patch in patches {
            self.apply_patch(node, patch)?;
        }
        Ok(())
    }

    /// Resolves one path segment below `parent`.
    fn child_at(&self, parent: NodeId, segment: &str, path: &str) -> TreeResult<NodeId> {
        let child = match &self.node(parent)?.content {
            Content::Array(children) => {
                let index = parse_index(segment, children.len(), false)
                    .map_err(|e| TreeError::from_pointer(path, e))?;
                children.get(index).copied()
            }
            Content::Model(entries) | Content::Map(entries) => entries.get(segment).copied(),
            Content::Scalar(_) => None,
        };
        child.ok_or_else(|| TreeError::path(path))
    }

    fn patch_index(
        &self,
        array: NodeId,
        segment: &str,
        path: &str,
        allow_end: bool,
    ) -> TreeResult<usize> {
        parse_index(segment, self.len(array)?, allow_end)
            .map_err(|e| TreeError::from_pointer(path, e))
    }
}
