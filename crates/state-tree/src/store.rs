//! The store: node registry, identifier index and listeners of any number of
//! independent trees.
//!
//! Every node lives in [`Store::nodes`] keyed by its [`NodeId`]. Parent links
//! are ids too, so the tree is an arena and moving a node is a matter of
//! rewriting two links. All mutation goes through `&mut Store`.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{TreeError, TreeResult};
use crate::listener::Listeners;
use crate::node::{ChildKey, Content, NodeData, NodeId, NodeKind, ParentLink};
use crate::options::StoreOptions;
use crate::registry::IdentifierIndex;
use crate::types::{Identifier, TypeDef, TypeRef};

/// A candidate for a container slot: plain data, or an existing node.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Value(Value),
    Node(NodeId),
}

impl From<Value> for Input {
    fn from(v: Value) -> Self {
        Input::Value(v)
    }
}

impl From<NodeId> for Input {
    fn from(id: NodeId) -> Self {
        Input::Node(id)
    }
}

#[derive(Default)]
pub struct Store {
    pub(crate) nodes: HashMap<NodeId, NodeData>,
    pub(crate) identifiers: IdentifierIndex,
    pub(crate) listeners: Listeners,
    pub(crate) options: StoreOptions,
    next_id: u64,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: StoreOptions) -> Self {
        Self { options, ..Self::default() }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    // ── Creation ────────────────────────────────────────────────────────

    /// Instantiates `value` as the root of a new tree with its own
    /// identifier scope.
    pub fn create(&mut self, ty: &TypeRef, value: Value) -> TreeResult<NodeId> {
        if !ty.is(&value) {
            return Err(TreeError::type_mismatch(ty.name(), &value));
        }
        let mut seen = HashSet::new();
        for (type_name, identifier) in collect_identifiers(ty, &value) {
            if !seen.insert((type_name.clone(), identifier.clone())) {
                return Err(TreeError::IdentifierConflict { type_name, identifier });
            }
        }
        let id = self.instantiate(ty, &value, None);
        self.refresh_paths(id);
        self.register_subtree(id, id);
        tracing::debug!(node = %id, ty = %ty.name(), "tree created");
        Ok(id)
    }

    fn alloc(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId(self.next_id)
    }

    /// Builds the node subtree for an already validated value. Paths and
    /// identifier registration are left to the caller.
    pub(crate) fn instantiate(
        &mut self,
        ty: &TypeRef,
        value: &Value,
        parent: Option<ParentLink>,
    ) -> NodeId {
        let id = self.alloc();
        let content = match ty.as_ref() {
            TypeDef::Primitive(_) => Content::Scalar(value.clone()),
            TypeDef::Model(m) => {
                let normalized = m.normalize(value);
                let mut fields = IndexMap::with_capacity(m.fields.len());
                for (key, field_ty) in &m.fields {
                    let field_value = normalized.get(key).cloned().unwrap_or(Value::Null);
                    let link = ParentLink { node: id, key: ChildKey::Key(key.clone()) };
                    let child = self.instantiate(field_ty, &field_value, Some(link));
                    fields.insert(key.clone(), child);
                }
                Content::Model(fields)
            }
            TypeDef::Array(a) => {
                let items = value.as_array().map(Vec::as_slice).unwrap_or_default();
                let mut children = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let link = ParentLink { node: id, key: ChildKey::Index(i) };
                    children.push(self.instantiate(&a.element, item, Some(link)));
                }
                Content::Array(children)
            }
            TypeDef::Map(m) => {
                let mut entries = IndexMap::new();
                if let Some(obj) = value.as_object() {
                    for (key, item) in obj {
                        let link = ParentLink { node: id, key: ChildKey::Key(key.clone()) };
                        entries.insert(key.clone(), self.instantiate(&m.value, item, Some(link)));
                    }
                }
                Content::Map(entries)
            }
        };
        let identifier = ty.identifier_of(value);
        self.nodes.insert(
            id,
            NodeData { ty: ty.clone(), parent, identifier, content, path: String::new() },
        );
        id
    }

    // ── Registry access ─────────────────────────────────────────────────

    pub(crate) fn node(&self, id: NodeId) -> TreeResult<&NodeData> {
        self.nodes.get(&id).ok_or(TreeError::UnknownNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> TreeResult<&mut NodeData> {
        self.nodes.get_mut(&id).ok_or(TreeError::UnknownNode(id))
    }

    /// True while `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of live nodes across all trees.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of identifier index entries across all trees.
    pub fn identifier_count(&self) -> usize {
        self.identifiers.len()
    }

    pub fn type_of(&self, id: NodeId) -> TreeResult<TypeRef> {
        Ok(self.node(id)?.ty.clone())
    }

    pub fn kind(&self, id: NodeId) -> TreeResult<NodeKind> {
        Ok(self.node(id)?.content.kind())
    }

    pub fn parent(&self, id: NodeId) -> TreeResult<Option<NodeId>> {
        Ok(self.node(id)?.parent.as_ref().map(|p| p.node))
    }

    /// Key of `id` inside its parent, `None` for roots.
    pub fn key_in_parent(&self, id: NodeId) -> TreeResult<Option<ChildKey>> {
        Ok(self.node(id)?.parent.as_ref().map(|p| p.key.clone()))
    }

    pub fn root_of(&self, id: NodeId) -> TreeResult<NodeId> {
        let mut cur = id;
        while let Some(parent) = &self.node(cur)?.parent {
            cur = parent.node;
        }
        Ok(cur)
    }

    pub fn identifier(&self, id: NodeId) -> TreeResult<Option<Identifier>> {
        Ok(self.node(id)?.identifier.clone())
    }

    /// Finds the live node of model type `type_name` holding `identifier` in
    /// the tree that contains `within`.
    pub fn resolve_identifier(
        &self,
        within: NodeId,
        type_name: &str,
        identifier: &Identifier,
    ) -> TreeResult<Option<NodeId>> {
        let root = self.root_of(within)?;
        Ok(self.identifiers.get(root, type_name, identifier))
    }

    /// Value of a scalar node.
    pub fn value(&self, id: NodeId) -> TreeResult<&Value> {
        match &self.node(id)?.content {
            Content::Scalar(v) => Ok(v),
            other => Err(TreeError::NotAContainer { node: id, kind: other.kind().as_str() }),
        }
    }

    /// Structural type check of a value, or of a node's current snapshot.
    pub fn is(&self, ty: &TypeDef, input: &Input) -> bool {
        match input {
            Input::Value(v) => ty.is(v),
            Input::Node(id) => self.get_snapshot(*id).is_ok_and(|snapshot| ty.is(&snapshot)),
        }
    }

    /// True if `ancestor` is `node` or lies on its parent chain.
    pub(crate) fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.nodes.get(&id).and_then(|d| d.parent.as_ref()).map(|p| p.node);
        }
        false
    }

    /// Node ids of the subtree rooted at `id`, parents before children.
    pub(crate) fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            out.push(cur);
            if let Some(data) = self.nodes.get(&cur) {
                for (_, child) in data.content.children().into_iter().rev() {
                    stack.push(child);
                }
            }
        }
        out
    }

    // ── Identifier registration ─────────────────────────────────────────

    pub(crate) fn register_subtree(&mut self, id: NodeId, root: NodeId) {
        for node in self.subtree(id) {
            let Some(data) = self.nodes.get(&node) else { continue };
            if let (Some(identifier), Some(model)) = (&data.identifier, data.ty.as_model()) {
                self.identifiers.insert(root, &model.name, identifier, node);
            }
        }
    }

    pub(crate) fn unregister_subtree(&mut self, id: NodeId, root: NodeId) {
        for node in self.subtree(id) {
            let Some(data) = self.nodes.get(&node) else { continue };
            if let (Some(identifier), Some(model)) = (&data.identifier, data.ty.as_model()) {
                self.identifiers.remove_if(root, &model.name, identifier, node);
            }
        }
    }

    /// Turns the subtree rooted at `id` into a tree of its own: its
    /// identifiers leave `root`'s scope and are registered under `id`. The
    /// node stays live, so it can be inserted again later.
    pub(crate) fn detach(&mut self, id: NodeId, root: NodeId) {
        self.unregister_subtree(id, root);
        if let Some(data) = self.nodes.get_mut(&id) {
            data.parent = None;
        }
        self.refresh_paths(id);
        self.register_subtree(id, id);
        tracing::trace!(node = %id, "detached subtree");
    }

    /// Frees a tree: every node of the subtree leaves the registry, its
    /// identifiers are dropped and its listeners forgotten. Later use of any
    /// of its ids fails with `UnknownNode`.
    ///
    /// Only roots can be destroyed; a node still attached to a container has
    /// to be removed from it first.
    pub fn destroy(&mut self, root: NodeId) -> TreeResult<()> {
        if self.node(root)?.parent.is_some() {
            return Err(TreeError::AlreadyAttached(root));
        }
        self.unregister_subtree(root, root);
        let doomed = self.subtree(root);
        tracing::debug!(node = %root, nodes = doomed.len(), "tree destroyed");
        for node in doomed {
            self.listeners.forget(node);
            self.nodes.remove(&node);
        }
        Ok(())
    }
}

/// Every `(model type name, identifier)` declared inside a raw value.
pub(crate) fn collect_identifiers(ty: &TypeDef, value: &Value) -> Vec<(String, Identifier)> {
    let mut out = Vec::new();
    collect_into(ty, value, &mut out);
    out
}

fn collect_into(ty: &TypeDef, value: &Value, out: &mut Vec<(String, Identifier)>) {
    match ty {
        TypeDef::Primitive(_) => {}
        TypeDef::Model(m) => {
            if let Some(identifier) = m.identifier_of(value) {
                out.push((m.name.clone(), identifier));
            }
            for (key, field_ty) in &m.fields {
                if let Some(field) = value.get(key) {
                    collect_into(field_ty, field, out);
                }
            }
        }
        TypeDef::Array(a) => {
            for item in value.as_array().into_iter().flatten() {
                collect_into(&a.element, item, out);
            }
        }
        TypeDef::Map(m) => {
            for item in value.as_object().into_iter().flat_map(|o| o.values()) {
                collect_into(&m.value, item, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeBuilder;
    use serde_json::json;

    #[test]
    fn create_builds_paths_for_nested_fields() {
        let t = TypeBuilder::new();
        let task = t.model("Task", [("done", t.optional(t.bool(), json!(false)))]);
        let ty = t.model("Store", [("todos", t.arr(task))]);
        let mut store = Store::new();
        let root = store.create(&ty, json!({"todos": [{}, {}]})).unwrap();
        let todos = store.field(root, "todos").unwrap();
        let second = store.get(todos, 1).unwrap().unwrap();
        let done = store.field(second, "done").unwrap();
        assert_eq!(store.get_path(root).unwrap(), "");
        assert_eq!(store.get_path(todos).unwrap(), "/todos");
        assert_eq!(store.get_path(done).unwrap(), "/todos/1/done");
        assert_eq!(store.root_of(done).unwrap(), root);
        assert_eq!(store.value(done).unwrap(), &json!(false));
    }

    #[test]
    fn create_rejects_duplicate_identifiers() {
        let t = TypeBuilder::new();
        let ty = t.arr(t.model("Task", [("id", t.id())]));
        let mut store = Store::new();
        let err = store.create(&ty, json!([{"id": 1}, {"id": 1}])).unwrap_err();
        assert!(matches!(err, TreeError::IdentifierConflict { .. }));
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn independent_trees_have_independent_scopes() {
        let t = TypeBuilder::new();
        let ty = t.arr(t.model("Task", [("id", t.id())]));
        let mut store = Store::new();
        let a = store.create(&ty, json!([{"id": "x"}])).unwrap();
        let b = store.create(&ty, json!([{"id": "x"}])).unwrap();
        let in_a = store.resolve_identifier(a, "Task", &"x".into()).unwrap().unwrap();
        let in_b = store.resolve_identifier(b, "Task", &"x".into()).unwrap().unwrap();
        assert_ne!(in_a, in_b);
        assert_eq!(store.root_of(in_a).unwrap(), a);
        assert!(std::sync::Arc::ptr_eq(&store.type_of(b).unwrap(), &ty));
        assert_eq!(store.identifier_count(), 2);
    }

    #[test]
    fn destroy_forgets_nodes_and_identifiers() {
        let t = TypeBuilder::new();
        let ty = t.model("Task", [("id", t.id()), ("tags", t.arr(t.str()))]);
        let mut store = Store::new();
        let root = store.create(&ty, json!({"id": 1, "tags": ["a", "b"]})).unwrap();
        let tags = store.field(root, "tags").unwrap();
        assert_eq!(store.node_count(), 5);
        assert_eq!(store.destroy(tags), Err(TreeError::AlreadyAttached(tags)));
        store.destroy(root).unwrap();
        assert_eq!(store.node_count(), 0);
        assert_eq!(store.identifier_count(), 0);
        assert_eq!(store.get_path(root), Err(TreeError::UnknownNode(root)));
    }

    #[test]
    fn detach_moves_identifiers_to_the_new_root() {
        let t = TypeBuilder::new();
        let task = t.model("Task", [("id", t.id())]);
        let mut store = Store::new();
        let list = store.create(&t.arr(task), json!([{"id": "a"}, {"id": "b"}])).unwrap();
        let a = store.get(list, 0).unwrap().unwrap();
        store.detach(a, list);
        assert_eq!(store.parent(a).unwrap(), None);
        assert_eq!(store.get_path(a).unwrap(), "");
        assert_eq!(store.resolve_identifier(list, "Task", &"a".into()).unwrap(), None);
        assert_eq!(store.resolve_identifier(a, "Task", &"a".into()).unwrap(), Some(a));
    }
}
