//! Patch and snapshot listeners.
//!
//! Listeners are plain callbacks registered per node. They run synchronously
//! after an operation has been fully committed: first every patch in
//! emission order, then one snapshot per observed node whose subtree changed.
//! A patch carries the path its target had when it was recorded, so the
//! stream replays in order onto a copy of the state before the operation.
//! Listeners only receive `&Patch` / `&Value`, so they cannot reenter the
//! store while it is being mutated.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use state_tree_pointer::relative;

use crate::error::TreeResult;
use crate::node::NodeId;
use crate::patch::Patch;
use crate::store::Store;

pub type PatchListener = Box<dyn FnMut(&Patch)>;
pub type SnapshotListener = Box<dyn FnMut(&Value)>;

/// Handle returned by `on_patch` / `on_snapshot`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct Listeners {
    next: u64,
    patch: BTreeMap<ListenerId, (NodeId, PatchListener)>,
    snapshot: BTreeMap<ListenerId, (NodeId, SnapshotListener)>,
}

impl Listeners {
    fn next_id(&mut self) -> ListenerId {
        self.next += 1;
        ListenerId(self.next)
    }

    pub fn wants_patches(&self) -> bool {
        !self.patch.is_empty()
    }

    fn observes(&self, node: NodeId) -> bool {
        self.patch.values().any(|(n, _)| *n == node)
    }

    /// Drops every listener attached to `node`.
    pub fn forget(&mut self, node: NodeId) {
        self.patch.retain(|_, (n, _)| *n != node);
        self.snapshot.retain(|_, (n, _)| *n != node);
    }
}

/// How far up the tree a recorded patch may travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Emit {
    /// To every ancestor up to the root.
    All,
    /// Only to listeners on this node or below it. Used for in-place updates
    /// of reconciled array slots, which their container already reports as a
    /// single `replace`.
    Below(NodeId),
}

/// Changes recorded while an operation commits, dispatched afterwards.
///
/// Patches are stored per observing node with the path already made
/// relative to it, as the tree looked when the patch was recorded.
#[derive(Debug, Default)]
pub(crate) struct Changes {
    patches: Vec<(NodeId, Patch)>,
    touched: Vec<NodeId>,
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch(&mut self, node: NodeId) {
        self.touched.push(node);
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }
}

impl Store {
    /// Subscribes to patches describing changes of `node`'s subtree, with
    /// paths relative to `node`.
    pub fn on_patch(
        &mut self,
        node: NodeId,
        listener: impl FnMut(&Patch) + 'static,
    ) -> TreeResult<ListenerId> {
        self.node(node)?;
        let id = self.listeners.next_id();
        self.listeners.patch.insert(id, (node, Box::new(listener)));
        Ok(id)
    }

    /// Subscribes to the new snapshot of `node` after every operation that
    /// changed its subtree.
    pub fn on_snapshot(
        &mut self,
        node: NodeId,
        listener: impl FnMut(&Value) + 'static,
    ) -> TreeResult<ListenerId> {
        self.node(node)?;
        let id = self.listeners.next_id();
        self.listeners.snapshot.insert(id, (node, Box::new(listener)));
        Ok(id)
    }

    /// Returns false if the listener was already gone.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.patch.remove(&id).is_some() || self.listeners.snapshot.remove(&id).is_some()
    }

    /// Chain from `node` up to the root, or up to `stop` inclusive.
    fn chain(&self, node: NodeId, stop: Option<NodeId>) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = Some(node);
        while let Some(id) = cur {
            out.push(id);
            if Some(id) == stop {
                break;
            }
            cur = self.nodes.get(&id).and_then(|d| d.parent.as_ref()).map(|p| p.node);
        }
        out
    }

    /// Records `patch`, whose path is relative to `anchor`, for every patch
    /// listener on the chain from `anchor` up to what `scope` allows.
    pub(crate) fn record(&self, changes: &mut Changes, anchor: NodeId, scope: Emit, patch: Patch) {
        if !self.listeners.wants_patches() {
            return;
        }
        let Some(anchor_path) = self.nodes.get(&anchor).map(|d| d.path.as_str()) else {
            return;
        };
        let full = format!("{anchor_path}{}", patch.path());
        let stop = match scope {
            Emit::All => None,
            Emit::Below(node) => Some(node),
        };
        for observed in self.chain(anchor, stop) {
            if !self.listeners.observes(observed) {
                continue;
            }
            let Some(base) = self.nodes.get(&observed).map(|d| d.path.as_str()) else {
                continue;
            };
            if let Some(rel) = relative(base, &full) {
                changes.patches.push((observed, patch.with_path(rel)));
            }
        }
    }

    pub(crate) fn dispatch(&mut self, changes: Changes) {
        for (observed, patch) in &changes.patches {
            for (node, listener) in self.listeners.patch.values_mut() {
                if *node == *observed {
                    listener(patch);
                }
            }
        }

        if self.listeners.snapshot.is_empty() || changes.touched.is_empty() {
            return;
        }
        let mut affected: HashSet<NodeId> = HashSet::new();
        for touched in &changes.touched {
            if self.nodes.contains_key(touched) {
                affected.extend(self.chain(*touched, None));
            }
        }
        let mut snapshots: Vec<(ListenerId, Value)> = Vec::new();
        for (lid, (observed, _)) in &self.listeners.snapshot {
            if affected.contains(observed) {
                if let Ok(snapshot) = self.get_snapshot(*observed) {
                    snapshots.push((*lid, snapshot));
                }
            }
        }
        for (lid, snapshot) in snapshots {
            if let Some((_, listener)) = self.listeners.snapshot.get_mut(&lid) {
                listener(&snapshot);
            }
        }
    }
}
