//! Reconciliation of incoming data against live nodes.
//!
//! Every mutation runs in two phases:
//!
//! 1. **Plan** ([`Planner`]): with a shared borrow of the store, validate all
//!    candidates and decide, recursively, which live node each one reuses.
//!    Any error here leaves the store exactly as it was.
//! 2. **Commit** (`Store::commit_*`): apply the plan. Slots are materialized
//!    (moving reused nodes out of wherever they sit), the container is
//!    rewritten from node identity, leftover children are detached, links
//!    and cached paths are refreshed and identifiers registered. Patches are
//!    recorded as they happen.
//!
//! Reuse rules for array candidates, in priority order:
//!
//! 1. a node that already is a child of this container, at any position, is
//!    moved as is; a detached root is adopted;
//! 2. a value whose identifier is held by an unclaimed node anywhere in the
//!    tree is applied in place onto that node, which moves to the new slot;
//! 3. a value is applied in place onto the unclaimed removed-range node at
//!    the same final index when both carry the same identifier (or none);
//! 4. anything else is created.
//!
//! Rules 1 and 2 run over all candidates before rule 3, so positional reuse
//! never takes a node an identifier asks for.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use state_tree_pointer::{append_index, append_key};

use crate::error::{TreeError, TreeResult};
use crate::listener::{Changes, Emit};
use crate::node::{ChildKey, Content, NodeId, NodeKind, ParentLink};
use crate::patch::Patch;
use crate::store::{collect_identifiers, Input, Store};
use crate::types::{Identifier, TypeDef, TypeRef};

pub(crate) enum Slot {
    /// Keep a live node of this tree, optionally updating it in place. The
    /// node may currently sit anywhere in the tree.
    Reuse { node: NodeId, update: Option<Update> },
    /// Move a detached root into this container.
    Adopt(NodeId),
    /// Instantiate a new node from validated data.
    Create(Value),
}

pub(crate) struct SplicePlan {
    pub array: NodeId,
    pub start: usize,
    pub delete_count: usize,
    /// Children of the array when the plan was made.
    pub before: Vec<NodeId>,
    pub slots: Vec<Slot>,
}

pub(crate) struct MapPlan {
    pub map: NodeId,
    pub entries: Vec<(String, Slot)>,
    pub removed: Vec<String>,
    /// Final key order is the order of `entries`.
    pub reorder: bool,
}

pub(crate) enum Update {
    Scalar { node: NodeId, value: Value },
    Model { fields: Vec<Update> },
    Array(SplicePlan),
    Map(MapPlan),
}

pub(crate) struct Planner<'s> {
    store: &'s Store,
    /// Root of the tree being mutated: the identifier scope.
    root: NodeId,
    claimed: HashSet<NodeId>,
    /// Children left unclaimed when their container was planned. A later
    /// claim wins over this.
    released: HashSet<NodeId>,
    introduced: Vec<(String, Identifier)>,
}

/// What a finished plan hands to the commit phase, and what the commit
/// records for dispatch.
pub(crate) struct Commit {
    claimed: HashSet<NodeId>,
    pub changes: Changes,
}

fn same_type(a: &TypeRef, b: &TypeRef, value: &Value) -> bool {
    Arc::ptr_eq(a, b) || a.is(value)
}

impl<'s> Planner<'s> {
    pub fn new(store: &'s Store, target: NodeId) -> TreeResult<Self> {
        Ok(Self {
            store,
            root: store.root_of(target)?,
            claimed: HashSet::new(),
            released: HashSet::new(),
            introduced: Vec::new(),
        })
    }

    fn validate(&self, ty: &TypeRef, input: &Input) -> TreeResult<()> {
        match input {
            Input::Value(v) if !ty.is(v) => Err(TreeError::type_mismatch(ty.name(), v)),
            Input::Value(_) => Ok(()),
            Input::Node(n) => {
                let snapshot = self.store.get_snapshot(*n)?;
                if ty.is(&snapshot) {
                    Ok(())
                } else {
                    Err(TreeError::type_mismatch(ty.name(), &snapshot))
                }
            }
        }
    }

    /// Two candidates of one batch may not declare the same identifier.
    fn check_batch_identifiers(&self, ty: &TypeRef, inputs: &[Input]) -> TreeResult<()> {
        let mut seen = HashSet::new();
        for input in inputs {
            let identifier = match input {
                Input::Value(v) => ty.identifier_of(v),
                Input::Node(n) => self.store.node(*n)?.identifier.clone(),
            };
            if let Some(identifier) = identifier {
                if !seen.insert(identifier.clone()) {
                    return Err(TreeError::IdentifierConflict { type_name: ty.name(), identifier });
                }
            }
        }
        Ok(())
    }

    fn create(&mut self, ty: &TypeRef, value: &Value) -> Slot {
        self.introduced.extend(collect_identifiers(ty, value));
        Slot::Create(value.clone())
    }

    fn reuse(
        &mut self,
        node: NodeId,
        value: Option<&Value>,
        rule: &'static str,
    ) -> TreeResult<Slot> {
        tracing::trace!(node = %node, rule, "reusing node");
        self.claimed.insert(node);
        let update = value.map(|v| self.plan_update(node, v)).transpose()?;
        Ok(Slot::Reuse { node, update })
    }

    /// A node candidate: moved if it already is a child of `container`,
    /// adopted if it is a detached root, rejected otherwise.
    fn plan_node(&mut self, node: NodeId, container: NodeId) -> TreeResult<Slot> {
        if self.claimed.contains(&node) {
            return Err(TreeError::AlreadyAttached(node));
        }
        let store = self.store;
        match &store.node(node)?.parent {
            Some(link) if link.node == container => return self.reuse(node, None, "move"),
            Some(_) => return Err(TreeError::AlreadyAttached(node)),
            None if store.is_ancestor_or_self(node, container) => {
                return Err(TreeError::AlreadyAttached(node));
            }
            None => {}
        }
        for member in store.subtree(node) {
            let Some(d) = store.nodes.get(&member) else { continue };
            if let (Some(identifier), Some(model)) = (&d.identifier, d.ty.as_model()) {
                self.introduced.push((model.name.clone(), identifier.clone()));
            }
        }
        tracing::trace!(node = %node, "adopting detached node");
        self.claimed.insert(node);
        Ok(Slot::Adopt(node))
    }

    fn identifier_holder(&self, ty: &TypeRef, value: &Value) -> Option<NodeId> {
        let model = ty.as_model()?;
        let identifier = model.identifier_of(value)?;
        self.store.identifiers.get(self.root, &model.name, &identifier)
    }

    /// The live holder of `value`'s identifier, if it can move into
    /// `container`: unclaimed, of a matching type, held by an array or a map
    /// and not above `container`.
    fn movable_holder(
        &self,
        ty: &TypeRef,
        value: &Value,
        container: NodeId,
    ) -> TreeResult<Option<NodeId>> {
        let Some(holder) = self.identifier_holder(ty, value) else {
            return Ok(None);
        };
        if self.claimed.contains(&holder) || self.store.is_ancestor_or_self(holder, container) {
            return Ok(None);
        }
        let data = self.store.node(holder)?;
        if !same_type(&data.ty, ty, value) {
            return Ok(None);
        }
        let Some(link) = &data.parent else {
            return Ok(None);
        };
        match self.store.kind(link.node)? {
            NodeKind::Array | NodeKind::Map => Ok(Some(holder)),
            NodeKind::Model | NodeKind::Scalar => Ok(None),
        }
    }

    pub fn plan_splice(
        &mut self,
        array: NodeId,
        start: usize,
        delete_count: usize,
        inputs: Vec<Input>,
    ) -> TreeResult<SplicePlan> {
        let store = self.store;
        let data = store.node(array)?;
        let (Content::Array(children), TypeDef::Array(array_ty)) = (&data.content, data.ty.as_ref())
        else {
            return Err(TreeError::NotAContainer { node: array, kind: data.content.kind().as_str() });
        };
        let element = &array_ty.element;
        let start = start.min(children.len());
        let delete_count = delete_count.min(children.len() - start);
        let removed = &children[start..start + delete_count];

        for input in &inputs {
            self.validate(element, input)?;
        }
        self.check_batch_identifiers(element, &inputs)?;

        let mut slots: Vec<Option<Slot>> = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let slot = match input {
                Input::Node(n) => Some(self.plan_node(*n, array)?),
                Input::Value(v) => match self.movable_holder(element, v, array)? {
                    Some(holder) => Some(self.reuse(holder, Some(v), "identifier")?),
                    None => None,
                },
            };
            slots.push(slot);
        }

        let mut planned = Vec::with_capacity(inputs.len());
        for (i, (slot, input)) in slots.into_iter().zip(&inputs).enumerate() {
            if let Some(slot) = slot {
                planned.push(slot);
                continue;
            }
            let Input::Value(v) = input else {
                continue;
            };
            let positional = removed.get(i).copied().filter(|old| !self.claimed.contains(old));
            let slot = match positional {
                Some(old) => {
                    let old_data = store.node(old)?;
                    if old_data.identifier == element.identifier_of(v)
                        && same_type(&old_data.ty, element, v)
                    {
                        self.reuse(old, Some(v), "position")?
                    } else {
                        self.create(element, v)
                    }
                }
                None => self.create(element, v),
            };
            planned.push(slot);
        }

        let unclaimed: Vec<NodeId> =
            removed.iter().copied().filter(|n| !self.claimed.contains(n)).collect();
        self.released.extend(unclaimed);
        Ok(SplicePlan { array, start, delete_count, before: children.clone(), slots: planned })
    }

    /// Plans applying a validated value onto `node` in place.
    pub fn plan_update(&mut self, node: NodeId, value: &Value) -> TreeResult<Update> {
        let store = self.store;
        let data = store.node(node)?;
        match (&data.content, data.ty.as_ref()) {
            (Content::Scalar(_), _) => {
                self.check_identifier_field(data.parent.as_ref(), value)?;
                Ok(Update::Scalar { node, value: value.clone() })
            }
            (Content::Model(fields), TypeDef::Model(model)) => {
                if let (Some(current), Some(next)) = (&data.identifier, model.identifier_of(value)) {
                    if *current != next {
                        return Err(TreeError::IdentifierImmutable {
                            type_name: model.name.clone(),
                            from: current.clone(),
                            to: next,
                        });
                    }
                }
                let normalized = model.normalize(value);
                let mut updates = Vec::with_capacity(fields.len());
                for (key, child) in fields {
                    let field_value = normalized.get(key).cloned().unwrap_or(Value::Null);
                    updates.push(self.plan_update(*child, &field_value)?);
                }
                Ok(Update::Model { fields: updates })
            }
            (Content::Array(children), _) => {
                let items = value
                    .as_array()
                    .ok_or_else(|| TreeError::type_mismatch(data.ty.name(), value))?;
                let inputs = items.iter().cloned().map(Input::Value).collect();
                Ok(Update::Array(self.plan_splice(node, 0, children.len(), inputs)?))
            }
            (Content::Map(_), _) => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| TreeError::type_mismatch(data.ty.name(), value))?;
                Ok(Update::Map(self.plan_map_replace(node, obj)?))
            }
            (content, _) => {
                Err(TreeError::NotAContainer { node, kind: content.kind().as_str() })
            }
        }
    }

    /// A scalar that is the identifier field of its model cannot take a
    /// different identifier.
    fn check_identifier_field(&self, link: Option<&ParentLink>, value: &Value) -> TreeResult<()> {
        let Some(ParentLink { node, key: ChildKey::Key(key) }) = link else {
            return Ok(());
        };
        let owner = self.store.node(*node)?;
        let (Some(model), Some(from)) = (owner.ty.as_model(), &owner.identifier) else {
            return Ok(());
        };
        if model.identifier_field() != Some(key.as_str()) {
            return Ok(());
        }
        match Identifier::from_value(value) {
            Some(to) if to != *from => Err(TreeError::IdentifierImmutable {
                type_name: model.name.clone(),
                from: from.clone(),
                to,
            }),
            _ => Ok(()),
        }
    }

    fn map_parts(&self, map: NodeId) -> TreeResult<(&'s IndexMap<String, NodeId>, &'s TypeRef)> {
        let store = self.store;
        let data = store.node(map)?;
        match (&data.content, data.ty.as_ref()) {
            (Content::Map(entries), TypeDef::Map(m)) => Ok((entries, &m.value)),
            (content, _) => {
                Err(TreeError::NotAContainer { node: map, kind: content.kind().as_str() })
            }
        }
    }

    fn plan_map_slot(
        &mut self,
        map: NodeId,
        ty: &TypeRef,
        existing: Option<NodeId>,
        input: &Input,
    ) -> TreeResult<Slot> {
        let v = match input {
            Input::Node(n) => return self.plan_node(*n, map),
            Input::Value(v) => v,
        };
        if let Some(old) = existing.filter(|old| !self.claimed.contains(old)) {
            let old_data = self.store.node(old)?;
            if old_data.identifier == ty.identifier_of(v) && same_type(&old_data.ty, ty, v) {
                return self.reuse(old, Some(v), "key");
            }
        }
        match self.movable_holder(ty, v, map)? {
            Some(holder) => self.reuse(holder, Some(v), "identifier"),
            None => Ok(self.create(ty, v)),
        }
    }

    pub fn plan_map_put(&mut self, map: NodeId, key: &str, input: Input) -> TreeResult<MapPlan> {
        let (entries, ty) = self.map_parts(map)?;
        self.validate(ty, &input)?;
        let existing = entries.get(key).copied();
        let slot = self.plan_map_slot(map, ty, existing, &input)?;
        if let Some(old) = existing.filter(|old| !self.claimed.contains(old)) {
            self.released.insert(old);
        }
        let entries = vec![(key.to_string(), slot)];
        Ok(MapPlan { map, entries, removed: Vec::new(), reorder: false })
    }

    pub fn plan_map_delete(&mut self, map: NodeId, key: &str) -> TreeResult<MapPlan> {
        let (entries, _) = self.map_parts(map)?;
        let Some(existing) = entries.get(key).copied() else {
            return Err(TreeError::path(append_key(&self.store.node(map)?.path, key)));
        };
        self.released.insert(existing);
        Ok(MapPlan { map, entries: Vec::new(), removed: vec![key.to_string()], reorder: false })
    }

    fn plan_map_replace(&mut self, map: NodeId, obj: &Map<String, Value>) -> TreeResult<MapPlan> {
        let (entries, ty) = self.map_parts(map)?;
        let inputs: Vec<Input> = obj.values().cloned().map(Input::Value).collect();
        self.check_batch_identifiers(ty, &inputs)?;
        let mut planned = Vec::with_capacity(obj.len());
        for ((key, _), input) in obj.iter().zip(&inputs) {
            let slot = self.plan_map_slot(map, ty, entries.get(key).copied(), input)?;
            planned.push((key.clone(), slot));
        }
        let removed: Vec<String> =
            entries.keys().filter(|k| !obj.contains_key(*k)).cloned().collect();
        let unclaimed: Vec<NodeId> =
            entries.values().copied().filter(|n| !self.claimed.contains(n)).collect();
        self.released.extend(unclaimed);
        Ok(MapPlan { map, entries: planned, removed, reorder: true })
    }

    /// True if `node` leaves the tree in the planned operation.
    fn will_release(&self, node: NodeId) -> bool {
        if self.claimed.contains(&node) {
            return false;
        }
        let mut cur = Some(node);
        while let Some(id) = cur {
            if self.released.contains(&id) {
                return true;
            }
            cur = self.store.nodes.get(&id).and_then(|d| d.parent.as_ref()).map(|p| p.node);
        }
        false
    }

    /// Final identifier check over everything the plan introduces: no
    /// duplicates, and no collision with a node that stays in the tree.
    pub fn finish(self) -> TreeResult<Commit> {
        let mut seen = HashSet::new();
        for (type_name, identifier) in &self.introduced {
            let conflict = !seen.insert((type_name, identifier))
                || self
                    .store
                    .identifiers
                    .get(self.root, type_name, identifier)
                    .is_some_and(|holder| !self.will_release(holder));
            if conflict {
                return Err(TreeError::IdentifierConflict {
                    type_name: type_name.clone(),
                    identifier: identifier.clone(),
                });
            }
        }
        Ok(Commit { claimed: self.claimed, changes: Changes::new() })
    }
}

// ── Commit ────────────────────────────────────────────────────────────────

impl Store {
    /// Takes `node` out of the container `link` points at, if it is still
    /// listed there, and reports the removal at its old position.
    fn take_from_parent(
        &mut self,
        node: NodeId,
        link: &ParentLink,
        commit: &mut Commit,
    ) -> TreeResult<()> {
        let container = link.node;
        let data = self.node_mut(container)?;
        let (patch, shifted) = match (&mut data.content, &link.key) {
            (Content::Array(children), _) => match children.iter().position(|c| *c == node) {
                Some(index) => {
                    children.remove(index);
                    (Patch::remove(append_index("", index)), Some((index, children.len())))
                }
                None => return Ok(()),
            },
            (Content::Map(entries), ChildKey::Key(key)) if entries.get(key) == Some(&node) => {
                entries.shift_remove(key);
                (Patch::remove(append_key("", key)), None)
            }
            (Content::Map(_), _) => return Ok(()),
            _ => return Err(TreeError::AlreadyAttached(node)),
        };
        if let Some((from, to)) = shifted {
            self.reindex_children(container, from, to);
        }
        self.record(&mut commit.changes, container, Emit::All, patch);
        commit.changes.touch(container);
        Ok(())
    }

    /// Moves `node` under `link`, out of wherever it currently sits. Its
    /// identifiers are dropped from the old scope; the caller registers them
    /// in the new one once the container is rewritten.
    fn relink(&mut self, node: NodeId, link: ParentLink, commit: &mut Commit) -> TreeResult<()> {
        let old_root = self.root_of(node)?;
        if let Some(old) = self.node(node)?.parent.clone() {
            self.take_from_parent(node, &old, commit)?;
        }
        self.unregister_subtree(node, old_root);
        self.node_mut(node)?.parent = Some(link);
        self.refresh_paths(node);
        Ok(())
    }

    /// Returns the slot's node and whether it was linked into the container
    /// by this call (and so still needs its identifiers registered).
    fn materialize(
        &mut self,
        slot: Slot,
        ty: &TypeRef,
        link: ParentLink,
        commit: &mut Commit,
    ) -> TreeResult<(NodeId, bool)> {
        match slot {
            Slot::Reuse { node, update } => {
                let moved = match &self.node(node)?.parent {
                    // Array positions are settled when the container is rewritten.
                    Some(p) if p.node == link.node => {
                        matches!(p.key, ChildKey::Key(_)) && p.key != link.key
                    }
                    _ => true,
                };
                if moved {
                    self.relink(node, link, commit)?;
                }
                if let Some(update) = update {
                    self.commit_update(update, Emit::Below(node), commit)?;
                }
                Ok((node, moved))
            }
            Slot::Adopt(node) => {
                self.relink(node, link, commit)?;
                Ok((node, true))
            }
            Slot::Create(value) => Ok((self.instantiate(ty, &value, Some(link)), true)),
        }
    }

    /// A child that left its container without being reused: detached when
    /// nothing claimed it, otherwise parked until its new container links it.
    fn drop_child(&mut self, node: NodeId, root: NodeId, commit: &Commit) -> TreeResult<bool> {
        if commit.claimed.contains(&node) {
            self.node_mut(node)?.parent = None;
            self.refresh_paths(node);
            Ok(false)
        } else {
            self.detach(node, root);
            Ok(true)
        }
    }

    pub(crate) fn commit_update(
        &mut self,
        update: Update,
        scope: Emit,
        commit: &mut Commit,
    ) -> TreeResult<()> {
        match update {
            Update::Scalar { node, value } => {
                let data = self.node_mut(node)?;
                let kind = data.content.kind();
                let Content::Scalar(current) = &mut data.content else {
                    return Err(TreeError::NotAContainer { node, kind: kind.as_str() });
                };
                let changed = *current != value;
                *current = value.clone();
                if changed {
                    commit.changes.touch(node);
                }
                if changed || !self.options.skip_unchanged_replace {
                    self.record(&mut commit.changes, node, scope, Patch::replace("", value));
                }
                Ok(())
            }
            Update::Model { fields } => {
                for field in fields {
                    self.commit_update(field, scope, commit)?;
                }
                Ok(())
            }
            Update::Array(plan) => self.commit_splice(plan, scope, commit).map(|_| ()),
            Update::Map(plan) => self.commit_map(plan, scope, commit).map(|_| ()),
        }
    }

    pub(crate) fn commit_splice(
        &mut self,
        plan: SplicePlan,
        scope: Emit,
        commit: &mut Commit,
    ) -> TreeResult<Vec<NodeId>> {
        let SplicePlan { array, start, delete_count, before, slots } = plan;
        let root = self.root_of(array)?;
        let element = match self.node(array)?.ty.as_ref() {
            TypeDef::Array(a) => a.element.clone(),
            other => return Err(TreeError::NotAContainer { node: array, kind: other.kind() }),
        };
        let range: HashSet<NodeId> = before[start..start + delete_count].iter().copied().collect();
        let head: HashSet<NodeId> = before[..start].iter().copied().collect();
        let reporting = self.listeners.wants_patches();
        let mut prior: HashMap<NodeId, Value> = HashMap::new();
        if reporting {
            for node in &range {
                prior.insert(*node, self.get_snapshot(*node)?);
            }
        }

        let inserted = slots.len();
        let mut ids = Vec::with_capacity(inserted);
        let mut linked = Vec::new();
        for (i, slot) in slots.into_iter().enumerate() {
            let link = ParentLink { node: array, key: ChildKey::Index(start + i) };
            let (id, is_linked) = self.materialize(slot, &element, link, commit)?;
            if is_linked {
                linked.push(id);
            }
            ids.push(id);
        }

        // Earlier commits of this operation may have taken children away,
        // so the layout is rebuilt from what the array holds now.
        let placed: HashSet<NodeId> = ids.iter().copied().collect();
        let current = self.array_children(array)?.clone();
        let (mut kept, mut tail, mut removed, mut moved_out) =
            (Vec::new(), Vec::new(), Vec::new(), Vec::new());
        for (index, node) in current.iter().enumerate() {
            if range.contains(node) {
                removed.push(*node);
            } else if placed.contains(node) {
                moved_out.push(index);
            } else if head.contains(node) {
                kept.push(*node);
            } else {
                tail.push(*node);
            }
        }
        let at = kept.len();
        let first_changed = moved_out.first().map_or(at, |i| (*i).min(at));
        let resized = !moved_out.is_empty() || removed.len() != inserted;
        kept.extend_from_slice(&ids);
        kept.extend(tail);
        let len = kept.len();
        {
            let data = self.node_mut(array)?;
            let kind = data.content.kind();
            let Content::Array(children) = &mut data.content else {
                return Err(TreeError::NotAContainer { node: array, kind: kind.as_str() });
            };
            *children = kept;
        }
        self.reindex_children(array, first_changed, if resized { len } else { at + inserted });

        let mut released = 0;
        for node in removed.iter().filter(|n| !placed.contains(*n)) {
            if self.drop_child(*node, root, commit)? {
                released += 1;
            }
        }
        for id in linked {
            self.register_subtree(id, root);
        }
        commit.changes.touch(array);

        if reporting {
            for index in moved_out.iter().rev() {
                let patch = Patch::remove(append_index("", *index));
                self.record(&mut commit.changes, array, scope, patch);
            }
            // An overlapping slot whose old or new occupant moved within the
            // range is reported as remove + add, so that a replica never
            // holds the moved identifier twice while replaying.
            let overlap = removed.len().min(inserted);
            let split: Vec<bool> = (0..overlap)
                .map(|i| {
                    ids[i] != removed[i]
                        && (removed.contains(&ids[i]) || placed.contains(&removed[i]))
                })
                .collect();
            for j in (0..removed.len()).rev() {
                if j >= overlap || split[j] {
                    let patch = Patch::remove(append_index("", at + j));
                    self.record(&mut commit.changes, array, scope, patch);
                }
            }
            for (i, id) in ids.iter().enumerate() {
                let value = self.get_snapshot(*id)?;
                let path = append_index("", at + i);
                if i >= overlap || split[i] {
                    self.record(&mut commit.changes, array, scope, Patch::add(path, value));
                } else if !self.options.skip_unchanged_replace
                    || prior.get(&removed[i]) != Some(&value)
                {
                    self.record(&mut commit.changes, array, scope, Patch::replace(path, value));
                }
            }
        }
        tracing::debug!(
            array = %array,
            start,
            delete_count,
            inserted,
            moved = moved_out.len(),
            released,
            patches = commit.changes.len(),
            "splice committed"
        );
        Ok(ids)
    }

    pub(crate) fn commit_map(
        &mut self,
        plan: MapPlan,
        scope: Emit,
        commit: &mut Commit,
    ) -> TreeResult<Vec<NodeId>> {
        let MapPlan { map, entries, removed, reorder } = plan;
        let root = self.root_of(map)?;
        let data = self.node(map)?;
        let (value_ty, before) = match (&data.content, data.ty.as_ref()) {
            (Content::Map(current), TypeDef::Map(m)) => (m.value.clone(), current.clone()),
            (content, _) => {
                return Err(TreeError::NotAContainer { node: map, kind: content.kind().as_str() })
            }
        };
        let reporting = self.listeners.wants_patches();
        let mut prior: HashMap<String, Value> = HashMap::new();
        if reporting {
            for (key, _) in &entries {
                if let Some(old) = before.get(key) {
                    prior.insert(key.clone(), self.get_snapshot(*old)?);
                }
            }
        }

        let mut placed = Vec::with_capacity(entries.len());
        let mut linked = Vec::new();
        for (key, slot) in entries {
            let link = ParentLink { node: map, key: ChildKey::Key(key.clone()) };
            let (id, is_linked) = self.materialize(slot, &value_ty, link, commit)?;
            if is_linked {
                linked.push(id);
            }
            placed.push((key, id));
        }

        let placed_ids: HashSet<NodeId> = placed.iter().map(|(_, id)| *id).collect();
        let (present, leftovers, gone) = {
            let data = self.node_mut(map)?;
            let kind = data.content.kind();
            let Content::Map(current) = &mut data.content else {
                return Err(TreeError::NotAContainer { node: map, kind: kind.as_str() });
            };
            let present: HashSet<String> = current.keys().cloned().collect();
            let mut leftovers = Vec::new();
            let mut gone = Vec::new();
            for key in removed.iter().chain(placed.iter().map(|(k, _)| k)) {
                if let Some(old) = current.get(key).copied() {
                    if !placed_ids.contains(&old) {
                        leftovers.push(old);
                    }
                }
            }
            for key in &removed {
                if current.shift_remove(key).is_some() {
                    gone.push(key.clone());
                }
            }
            if reorder {
                *current = placed.iter().cloned().collect();
            } else {
                for (key, id) in &placed {
                    current.insert(key.clone(), *id);
                }
            }
            (present, leftovers, gone)
        };
        for (_, id) in &placed {
            self.refresh_paths(*id);
        }
        let mut released = 0;
        for node in leftovers {
            if self.drop_child(node, root, commit)? {
                released += 1;
            }
        }
        for id in linked {
            self.register_subtree(id, root);
        }
        commit.changes.touch(map);

        if reporting {
            for key in &gone {
                self.record(&mut commit.changes, map, scope, Patch::remove(append_key("", key)));
            }
            for (key, id) in &placed {
                let value = self.get_snapshot(*id)?;
                let path = append_key("", key);
                match prior.get(key).filter(|_| present.contains(key)) {
                    None => self.record(&mut commit.changes, map, scope, Patch::add(path, value)),
                    Some(old) if !self.options.skip_unchanged_replace || *old != value => {
                        self.record(&mut commit.changes, map, scope, Patch::replace(path, value))
                    }
                    Some(_) => {}
                }
            }
        }
        tracing::debug!(
            map = %map,
            written = placed.len(),
            removed = gone.len(),
            released,
            "map update committed"
        );
        Ok(placed.into_iter().map(|(_, id)| id).collect())
    }
}
