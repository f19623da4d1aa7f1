//! Array operations.
//!
//! `push`, `unshift` and `set_index` are all expressed as a [`Store::splice`],
//! so they share its reconciliation, validation and patch semantics.

use state_tree_pointer::append_index;

use crate::error::{TreeError, TreeResult};
use crate::listener::Emit;
use crate::node::{Content, NodeId};
use crate::reconcile::Planner;
use crate::store::{Input, Store};

impl Store {
    pub(crate) fn array_children(&self, array: NodeId) -> TreeResult<&Vec<NodeId>> {
        match &self.node(array)?.content {
            Content::Array(children) => Ok(children),
            other => Err(TreeError::NotAContainer { node: array, kind: other.kind().as_str() }),
        }
    }

    pub fn len(&self, array: NodeId) -> TreeResult<usize> {
        Ok(self.array_children(array)?.len())
    }

    /// Current children of an array, in order.
    pub fn children(&self, array: NodeId) -> TreeResult<&[NodeId]> {
        Ok(self.array_children(array)?.as_slice())
    }

    /// Child at `index`, `None` past the end.
    pub fn get(&self, array: NodeId, index: usize) -> TreeResult<Option<NodeId>> {
        Ok(self.array_children(array)?.get(index).copied())
    }

    /// Appends candidates at the end. Returns the inserted nodes.
    pub fn push<I, T>(&mut self, array: NodeId, inputs: I) -> TreeResult<Vec<NodeId>>
    where
        I: IntoIterator<Item = T>,
        T: Into<Input>,
    {
        let len = self.len(array)?;
        self.splice(array, len, 0, inputs)
    }

    /// Inserts candidates at the front. Returns the inserted nodes.
    pub fn unshift<I, T>(&mut self, array: NodeId, inputs: I) -> TreeResult<Vec<NodeId>>
    where
        I: IntoIterator<Item = T>,
        T: Into<Input>,
    {
        self.splice(array, 0, 0, inputs)
    }

    /// Removes `delete_count` children starting at `start` and inserts the
    /// candidates in their place, reconciling them against the removed
    /// range. `start` is clamped to the length and `delete_count` to what
    /// remains after `start`.
    ///
    /// Returns the nodes now occupying the inserted positions, which may be
    /// previously removed nodes that were reused.
    ///
    /// On error nothing changes and no listener fires.
    pub fn splice<I, T>(
        &mut self,
        array: NodeId,
        start: usize,
        delete_count: usize,
        inputs: I,
    ) -> TreeResult<Vec<NodeId>>
    where
        I: IntoIterator<Item = T>,
        T: Into<Input>,
    {
        let inputs: Vec<Input> = inputs.into_iter().map(Into::into).collect();
        let (plan, mut commit) = {
            let mut planner = Planner::new(self, array)?;
            let plan = planner.plan_splice(array, start, delete_count, inputs)?;
            (plan, planner.finish()?)
        };
        let ids = self.commit_splice(plan, Emit::All, &mut commit)?;
        self.dispatch(commit.changes);
        Ok(ids)
    }

    /// Replaces the child at `index` with one candidate. `index == len`
    /// appends; anything further is a path error.
    pub fn set_index(
        &mut self,
        array: NodeId,
        index: usize,
        input: impl Into<Input>,
    ) -> TreeResult<NodeId> {
        let path = self.node(array)?.path.clone();
        let len = self.len(array)?;
        if index > len {
            return Err(TreeError::path(append_index(&path, index)));
        }
        self.splice(array, index, usize::from(index < len), [input.into()])?
            .into_iter()
            .next()
            .ok_or_else(|| TreeError::path(append_index(&path, index)))
    }
}
