#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};
use state_tree::{NodeId, Patch, Store, TypeBuilder, TypeRef};

/// `{to: string = "world"}[]` and its element type.
pub fn item_list() -> (TypeRef, TypeRef) {
    let t = TypeBuilder::new();
    let item = t.model("Item", [("to", t.optional(t.str(), json!("world")))]);
    (t.arr(item.clone()), item)
}

/// `{todos: Task[]}` where Task is `{id, task = "", done = false}`.
pub fn keyed_todos() -> TypeRef {
    let t = TypeBuilder::new();
    let task = t.model(
        "Task",
        [
            ("id", t.id()),
            ("task", t.optional(t.str(), json!(""))),
            ("done", t.optional(t.bool(), json!(false))),
        ],
    );
    t.model("TodoStore", [("todos", t.arr(task))])
}

/// `{todos: Task[]}` where Task is `{x: string}`, without identifier.
pub fn plain_todos() -> (TypeRef, TypeRef) {
    let t = TypeBuilder::new();
    let task = t.model("Task", [("x", t.str())]);
    (t.model("TodoStore", [("todos", t.arr(task.clone()))]), task)
}

pub fn record_patches(store: &mut Store, node: NodeId) -> Rc<RefCell<Vec<Patch>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    store
        .on_patch(node, move |p| sink.borrow_mut().push(p.clone()))
        .expect("on_patch must succeed");
    seen
}

pub fn record_snapshots(store: &mut Store, node: NodeId) -> Rc<RefCell<Vec<Value>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    store
        .on_snapshot(node, move |s| sink.borrow_mut().push(s.clone()))
        .expect("on_snapshot must succeed");
    seen
}

pub fn child_paths(store: &Store, array: NodeId) -> Vec<String> {
    store
        .children(array)
        .unwrap()
        .iter()
        .map(|c| store.get_path(*c).unwrap())
        .collect()
}

pub fn field_value(store: &Store, model: NodeId, key: &str) -> Value {
    store.value(store.field(model, key).unwrap()).unwrap().clone()
}
