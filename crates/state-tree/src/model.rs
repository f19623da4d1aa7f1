//! Model field access.

use serde_json::Value;
use state_tree_pointer::append_key;

use crate::error::{TreeError, TreeResult};
use crate::node::{Content, NodeId};
use crate::store::Store;

impl Store {
    /// Node of field `key` of a model.
    pub fn field(&self, model: NodeId, key: &str) -> TreeResult<NodeId> {
        let data = self.node(model)?;
        match &data.content {
            Content::Model(fields) => fields
                .get(key)
                .copied()
                .ok_or_else(|| TreeError::path(append_key(&data.path, key))),
            other => Err(TreeError::NotAContainer { node: model, kind: other.kind().as_str() }),
        }
    }

    /// Field names of a model, in declaration order.
    pub fn field_names(&self, model: NodeId) -> TreeResult<Vec<&str>> {
        match &self.node(model)?.content {
            Content::Model(fields) => Ok(fields.keys().map(String::as_str).collect()),
            other => Err(TreeError::NotAContainer { node: model, kind: other.kind().as_str() }),
        }
    }

    /// Writes `value` into field `key`, reconciling it with the field's
    /// current node.
    pub fn set_field(&mut self, model: NodeId, key: &str, value: Value) -> TreeResult<()> {
        let child = self.field(model, key)?;
        self.apply_snapshot(child, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeBuilder;
    use serde_json::json;

    #[test]
    fn set_field_keeps_the_field_node() {
        let t = TypeBuilder::new();
        let ty = t.model("Todo", [("title", t.str()), ("tags", t.arr(t.str()))]);
        let mut store = Store::new();
        let todo = store.create(&ty, json!({"title": "a", "tags": []})).unwrap();
        let title = store.field(todo, "title").unwrap();
        store.set_field(todo, "title", json!("b")).unwrap();
        assert_eq!(store.field(todo, "title").unwrap(), title);
        assert_eq!(store.value(title).unwrap(), &json!("b"));
        assert_eq!(store.field_names(todo).unwrap(), vec!["title", "tags"]);
    }

    #[test]
    fn unknown_field_and_bad_value() {
        let t = TypeBuilder::new();
        let ty = t.model("Todo", [("title", t.str())]);
        let mut store = Store::new();
        let todo = store.create(&ty, json!({"title": "a"})).unwrap();
        assert_eq!(
            store.field(todo, "nope"),
            Err(TreeError::PathResolution { path: "/nope".into() })
        );
        let err = store.set_field(todo, "title", json!(3)).unwrap_err();
        assert!(matches!(err, TreeError::TypeMismatch { .. }));
        assert_eq!(store.get_snapshot(todo).unwrap(), json!({"title": "a"}));
    }
}
