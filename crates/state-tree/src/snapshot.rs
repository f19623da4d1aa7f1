//! Snapshots: reading a subtree out as plain data and reconciling plain data
//! back into it.

use serde_json::{Map, Value};

use crate::error::{TreeError, TreeResult};
use crate::listener::Emit;
use crate::node::{Content, NodeId};
use crate::reconcile::Planner;
use crate::store::Store;

impl Store {
    /// Plain data of the subtree rooted at `node`. Models and maps become
    /// objects in field / insertion order, arrays become arrays.
    pub fn get_snapshot(&self, node: NodeId) -> TreeResult<Value> {
        Ok(match &self.node(node)?.content {
            Content::Scalar(v) => v.clone(),
            Content::Array(children) => Value::Array(
                children.iter().map(|c| self.get_snapshot(*c)).collect::<TreeResult<_>>()?,
            ),
            Content::Model(entries) | Content::Map(entries) => {
                let mut obj = Map::with_capacity(entries.len());
                for (key, child) in entries {
                    obj.insert(key.clone(), self.get_snapshot(*child)?);
                }
                Value::Object(obj)
            }
        })
    }

    /// Reconciles `value` into the subtree rooted at `node`, in place.
    ///
    /// Scalars take the new value, models update field by field, arrays are
    /// reconciled as a full-range splice (so children keep their identity by
    /// identifier, then by position), maps entry by entry. `node` itself is
    /// never replaced.
    pub fn apply_snapshot(&mut self, node: NodeId, value: Value) -> TreeResult<()> {
        let ty = self.node(node)?.ty.clone();
        if !ty.is(&value) {
            return Err(TreeError::type_mismatch(ty.name(), &value));
        }
        let (update, mut commit) = {
            let mut planner = Planner::new(self, node)?;
            let update = planner.plan_update(node, &value)?;
            (update, planner.finish()?)
        };
        self.commit_update(update, Emit::All, &mut commit)?;
        self.dispatch(commit.changes);
        tracing::debug!(node = %node, ty = %ty.name(), "snapshot applied");
        Ok(())
    }
}
