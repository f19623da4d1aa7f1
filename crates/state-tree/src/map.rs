//! Map operations. Entries keep insertion order.

use crate::error::{TreeError, TreeResult};
use crate::listener::Emit;
use crate::node::{Content, NodeId};
use crate::reconcile::{Commit, MapPlan, Planner};
use crate::store::{Input, Store};

impl Store {
    pub fn map_get(&self, map: NodeId, key: &str) -> TreeResult<Option<NodeId>> {
        match &self.node(map)?.content {
            Content::Map(entries) => Ok(entries.get(key).copied()),
            other => Err(TreeError::NotAContainer { node: map, kind: other.kind().as_str() }),
        }
    }

    pub fn map_keys(&self, map: NodeId) -> TreeResult<Vec<&str>> {
        match &self.node(map)?.content {
            Content::Map(entries) => Ok(entries.keys().map(String::as_str).collect()),
            other => Err(TreeError::NotAContainer { node: map, kind: other.kind().as_str() }),
        }
    }

    /// Writes an entry. A value landing on an entry with the same identifier
    /// (or on an identifier-less entry) updates it in place. A value whose
    /// identifier is held elsewhere in the tree moves that node here.
    /// Otherwise the previous entry is detached.
    pub fn map_put(&mut self, map: NodeId, key: &str, input: impl Into<Input>) -> TreeResult<NodeId> {
        let input = input.into();
        let plan = self.plan_map(map, |planner| planner.plan_map_put(map, key, input))?;
        let ids = self.commit_map_and_dispatch(plan)?;
        ids.into_iter().next().ok_or_else(|| TreeError::path(key))
    }

    /// Removes and detaches an entry. A missing key is a path error.
    pub fn map_delete(&mut self, map: NodeId, key: &str) -> TreeResult<()> {
        let plan = self.plan_map(map, |planner| planner.plan_map_delete(map, key))?;
        self.commit_map_and_dispatch(plan).map(|_| ())
    }

    fn plan_map(
        &self,
        map: NodeId,
        plan: impl FnOnce(&mut Planner<'_>) -> TreeResult<MapPlan>,
    ) -> TreeResult<(MapPlan, Commit)> {
        let mut planner = Planner::new(self, map)?;
        let planned = plan(&mut planner)?;
        Ok((planned, planner.finish()?))
    }

    fn commit_map_and_dispatch(
        &mut self,
        (plan, mut commit): (MapPlan, Commit),
    ) -> TreeResult<Vec<NodeId>> {
        let ids = self.commit_map(plan, Emit::All, &mut commit)?;
        self.dispatch(commit.changes);
        Ok(ids)
    }
}
