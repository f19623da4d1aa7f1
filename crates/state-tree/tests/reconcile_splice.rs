mod common;

use common::{child_paths, field_value, keyed_todos, plain_todos, record_patches};
use serde_json::{json, Value};
use state_tree::{Input, Patch, Store, TreeError, TypeBuilder};

/// `{todo: Task[], done: Task[]}` with identified tasks.
fn board() -> state_tree::TypeRef {
    let t = TypeBuilder::new();
    let task = t.model(
        "Task",
        [
            ("id", t.id()),
            ("task", t.optional(t.str(), json!(""))),
            ("done", t.optional(t.bool(), json!(false))),
        ],
    );
    t.model("Board", [("todo", t.arr(task.clone())), ("done", t.arr(task))])
}

#[test]
fn removed_nodes_can_be_spliced_back_in() {
    let (ty, task) = plain_todos();
    let mut store = Store::new();
    let [a, b, c, d] = ["a", "b", "c", "d"]
        .map(|x| store.create(&task, json!({ "x": x })).expect("create must succeed"));
    let root = store.create(&ty, json!({"todos": []})).unwrap();
    let todos = store.field(root, "todos").unwrap();

    store.push(todos, [a]).unwrap();
    assert_eq!(store.children(todos).unwrap(), [a]);

    store.push(todos, [b]).unwrap();
    assert_eq!(store.children(todos).unwrap(), [a, b]);

    store.unshift(todos, [c]).unwrap();
    assert_eq!(store.children(todos).unwrap(), [c, a, b]);
    assert_eq!(store.get_path(a).unwrap(), "/todos/1");

    store.splice(todos, 0, 2, Vec::<Input>::new()).unwrap();
    assert_eq!(store.children(todos).unwrap(), [b]);
    assert_eq!(store.parent(a).unwrap(), None);
    assert_eq!(store.root_of(c).unwrap(), c);
    assert_eq!(store.get_snapshot(a).unwrap(), json!({"x": "a"}));

    store.splice(todos, 0, 1, [a, c, d]).unwrap();
    assert_eq!(store.children(todos).unwrap(), [a, c, d]);
    assert_eq!(child_paths(&store, todos), ["/todos/0", "/todos/1", "/todos/2"]);
    assert_eq!(store.root_of(a).unwrap(), root);
    assert_eq!(store.get_path(store.field(c, "x").unwrap()).unwrap(), "/todos/1/x");
    assert_eq!(store.parent(b).unwrap(), None);
    assert_eq!(
        store.get_snapshot(root).unwrap(),
        json!({"todos": [{"x": "a"}, {"x": "c"}, {"x": "d"}]})
    );
}

#[test]
fn unshifting_an_existing_child_moves_it_to_the_front() {
    let (ty, _) = plain_todos();
    let mut store = Store::new();
    let root = store
        .create(&ty, json!({"todos": [{"x": "a"}, {"x": "b"}, {"x": "c"}]}))
        .unwrap();
    let todos = store.field(root, "todos").unwrap();
    let [a, b, c] = [0, 1, 2].map(|i| store.get(todos, i).unwrap().unwrap());
    let patches = record_patches(&mut store, todos);

    let placed = store.unshift(todos, [c]).unwrap();

    assert_eq!(placed, [c]);
    assert_eq!(store.children(todos).unwrap(), [c, a, b]);
    assert_eq!(child_paths(&store, todos), ["/todos/0", "/todos/1", "/todos/2"]);
    assert_eq!(store.get_path(store.field(c, "x").unwrap()).unwrap(), "/todos/0/x");
    assert_eq!(
        *patches.borrow(),
        vec![Patch::remove("/2"), Patch::add("/0", json!({"x": "c"}))]
    );

    let mut replica = Store::new();
    let copy = replica
        .create(&ty, json!({"todos": [{"x": "a"}, {"x": "b"}, {"x": "c"}]}))
        .unwrap();
    let copy_todos = replica.field(copy, "todos").unwrap();
    replica.apply_patches(copy_todos, patches.borrow().iter()).unwrap();
    assert_eq!(replica.get_snapshot(copy).unwrap(), store.get_snapshot(root).unwrap());
}

#[test]
fn pushing_an_existing_identifier_moves_the_record_to_the_end() {
    let mut store = Store::new();
    let root = store
        .create(&keyed_todos(), json!({"todos": [{"id": "1"}, {"id": "2"}]}))
        .unwrap();
    let todos = store.field(root, "todos").unwrap();
    let [n1, n2] = [0, 1].map(|i| store.get(todos, i).unwrap().unwrap());
    let patches = record_patches(&mut store, todos);

    let placed = store.push(todos, [json!({"id": "1", "task": "moved"})]);

    assert_eq!(placed, Ok(vec![n1]));
    assert_eq!(store.children(todos).unwrap(), [n2, n1]);
    assert_eq!(field_value(&store, n1, "task"), json!("moved"));
    assert_eq!(store.get_path(n1).unwrap(), "/todos/1");
    assert_eq!(store.get_path(n2).unwrap(), "/todos/0");
    assert_eq!(store.identifier_count(), 2);
    assert_eq!(
        *patches.borrow(),
        vec![
            Patch::remove("/0"),
            Patch::add("/1", json!({"id": "1", "task": "moved", "done": false})),
        ]
    );
}

#[test]
fn snapshot_moves_a_record_between_arrays() {
    let ty = board();
    let mut store = Store::new();
    let initial = json!({"todo": [{"id": "1", "task": "a"}, {"id": "2", "task": "b"}], "done": []});
    let root = store.create(&ty, initial.clone()).unwrap();
    let todo = store.field(root, "todo").unwrap();
    let done = store.field(root, "done").unwrap();
    let [first, second] = [0, 1].map(|i| store.get(todo, i).unwrap().unwrap());
    let patches = record_patches(&mut store, root);

    let next = json!({
        "todo": [{"id": "2", "task": "b"}],
        "done": [{"id": "1", "task": "a", "done": true}]
    });
    store.apply_snapshot(root, next).unwrap();

    assert_eq!(store.children(todo).unwrap(), [second]);
    assert_eq!(store.children(done).unwrap(), [first]);
    assert_eq!(store.get_path(first).unwrap(), "/done/0");
    assert_eq!(store.get_path(second).unwrap(), "/todo/0");
    assert_eq!(field_value(&store, first, "done"), json!(true));
    assert_eq!(store.resolve_identifier(root, "Task", &"1".into()).unwrap(), Some(first));
    assert_eq!(store.identifier_count(), 2);

    let mut replica = Store::new();
    let copy = replica.create(&ty, initial).unwrap();
    replica.apply_patches(copy, patches.borrow().iter()).unwrap();
    assert_eq!(replica.get_snapshot(copy).unwrap(), store.get_snapshot(root).unwrap());
}

#[test]
fn pushing_into_another_array_moves_the_holder() {
    let ty = board();
    let mut store = Store::new();
    let root = store
        .create(&ty, json!({"todo": [{"id": "1", "task": "a"}], "done": [{"id": "2"}]}))
        .unwrap();
    let todo = store.field(root, "todo").unwrap();
    let done = store.field(root, "done").unwrap();
    let first = store.get(todo, 0).unwrap().unwrap();
    let patches = record_patches(&mut store, root);

    let placed = store.push(done, [json!({"id": "1", "task": "a", "done": true})]).unwrap();

    assert_eq!(placed, [first]);
    assert_eq!(store.len(todo).unwrap(), 0);
    assert_eq!(store.get_path(first).unwrap(), "/done/1");
    assert_eq!(
        *patches.borrow(),
        vec![
            Patch::remove("/todo/0"),
            Patch::add("/done/1", json!({"id": "1", "task": "a", "done": true})),
        ]
    );
}

#[test]
fn one_batch_cannot_declare_an_identifier_twice() {
    let mut store = Store::new();
    let root = store.create(&keyed_todos(), json!({"todos": [{"id": "1"}]})).unwrap();
    let todos = store.field(root, "todos").unwrap();
    let before = store.get_snapshot(root).unwrap();

    let err = store.push(todos, [json!({"id": "2"}), json!({"id": "2", "task": "again"})]);

    assert_eq!(
        err,
        Err(TreeError::IdentifierConflict { type_name: "Task".into(), identifier: "2".into() })
    );
    assert_eq!(store.get_snapshot(root).unwrap(), before);
}

#[test]
fn positional_reuse_and_moves_on_splice() {
    let (ty, _) = plain_todos();
    let mut store = Store::new();
    let root = store
        .create(&ty, json!({"todos": [{"x": "a"}, {"x": "b"}, {"x": "c"}, {"x": "d"}]}))
        .unwrap();
    let todos = store.field(root, "todos").unwrap();
    let [a, b, c, d] = [0, 1, 2, 3].map(|i| store.get(todos, i).unwrap().unwrap());

    store.splice(todos, 2, 1, [json!({"x": "e"}), json!({"x": "f"})]).unwrap();
    let now = store.children(todos).unwrap().to_vec();
    assert_eq!(now.len(), 5);
    assert_eq!(now[0], a);
    assert_eq!(now[1], b);
    assert_eq!(now[2], c, "reconciled in place");
    assert_eq!(field_value(&store, c, "x"), json!("e"));
    assert_ne!(now[3], d, "not reconciled");
    assert_eq!(field_value(&store, now[3], "x"), json!("f"));
    assert_eq!(now[4], d, "preserved and moved");
    assert_eq!(field_value(&store, d, "x"), json!("d"));
    assert_eq!(
        child_paths(&store, todos),
        ["/todos/0", "/todos/1", "/todos/2", "/todos/3", "/todos/4"]
    );
    assert_eq!(store.get_path(store.field(d, "x").unwrap()).unwrap(), "/todos/4/x");

    store.splice(todos, 1, 3, [json!({"x": "g"})]).unwrap();
    let now = store.children(todos).unwrap().to_vec();
    assert_eq!(now.len(), 3);
    assert_eq!(now[0], a);
    assert_eq!(now[1], b, "still reconciled");
    assert_eq!(field_value(&store, b, "x"), json!("g"));
    assert_eq!(now[2], d, "d keeps its node");
    assert_eq!(store.parent(c).unwrap(), None);
    assert_eq!(child_paths(&store, todos), ["/todos/0", "/todos/1", "/todos/2"]);
}

#[test]
fn keyed_snapshot_reuses_records_by_identifier() {
    let mut store = Store::new();
    let root = store
        .create(
            &keyed_todos(),
            json!({"todos": [
                {"id": "1", "task": "coffee", "done": false},
                {"id": "2", "task": "tea", "done": false},
                {"id": "3", "task": "biscuit", "done": false}
            ]}),
        )
        .unwrap();
    let todos = store.field(root, "todos").unwrap();
    let [a, b, c] = [0, 1, 2].map(|i| store.get(todos, i).unwrap().unwrap());

    store
        .apply_snapshot(
            root,
            json!({"todos": [
                {"id": "2", "task": "Tee", "done": true},
                {"id": "1", "task": "coffee", "done": true},
                {"id": "4", "task": "biscuit", "done": false},
                {"id": "5", "task": "stuffz", "done": false}
            ]}),
        )
        .unwrap();

    let now = store.children(todos).unwrap().to_vec();
    let read = |key: &str| -> Vec<Value> {
        now.iter().map(|n| field_value(&store, *n, key)).collect()
    };
    assert_eq!(read("task"), [json!("Tee"), json!("coffee"), json!("biscuit"), json!("stuffz")]);
    assert_eq!(read("done"), [json!(true), json!(true), json!(false), json!(false)]);
    assert_eq!(read("id"), [json!("2"), json!("1"), json!("4"), json!("5")]);

    assert_eq!(now[0], b);
    assert_eq!(now[1], a);
    assert_ne!(now[2], c);
    assert_eq!(store.root_of(c).unwrap(), c);
    assert_eq!(store.resolve_identifier(root, "Task", &"3".into()).unwrap(), None);
    assert_eq!(store.resolve_identifier(c, "Task", &"3".into()).unwrap(), Some(c));
    assert_eq!(store.resolve_identifier(root, "Task", &"4".into()).unwrap(), Some(now[2]));
    assert_eq!(store.resolve_identifier(root, "Task", &"1".into()).unwrap(), Some(a));
    assert_eq!(store.get_path(a).unwrap(), "/todos/1");
    store.destroy(c).unwrap();
    assert!(!store.contains(c));
    assert_eq!(store.identifier_count(), 4);
}

#[test]
fn numeric_identifiers_reorder_by_reference() {
    let t = TypeBuilder::new();
    let ty = t.arr(t.model("Row", [("id", t.id())]));
    let mut store = Store::new();
    let rows = store.create(&ty, json!([{"id": 1}, {"id": 2}, {"id": 3}])).unwrap();
    let [one, two, _three] = [0, 1, 2].map(|i| store.get(rows, i).unwrap().unwrap());

    store.apply_snapshot(rows, json!([{"id": 2}, {"id": 1}, {"id": 4}, {"id": 5}])).unwrap();

    assert_eq!(store.get(rows, 0).unwrap(), Some(two));
    assert_eq!(store.get(rows, 1).unwrap(), Some(one));
    assert_eq!(store.len(rows).unwrap(), 4);
    assert_eq!(store.resolve_identifier(rows, "Row", &3i64.into()).unwrap(), None);
}

#[test]
fn identifier_wins_over_position() {
    let mut store = Store::new();
    let root = store
        .create(&keyed_todos(), json!({"todos": [{"id": "a"}, {"id": "b"}]}))
        .unwrap();
    let todos = store.field(root, "todos").unwrap();
    let [a, b] = [0, 1].map(|i| store.get(todos, i).unwrap().unwrap());

    let placed = store
        .splice(todos, 0, 2, [json!({"id": "b", "task": "x"}), json!({"id": "c"})])
        .unwrap();

    assert_eq!(placed[0], b);
    assert_ne!(placed[1], a, "a different identifier never reuses by position");
    assert_eq!(store.parent(a).unwrap(), None);
}

#[test]
fn reordered_records_are_reported_as_remove_and_add() {
    let t = TypeBuilder::new();
    let ty = t.arr(t.model("Row", [("id", t.id())]));
    let mut store = Store::new();
    let rows = store.create(&ty, json!([{"id": 1}, {"id": 2}])).unwrap();
    let patches = record_patches(&mut store, rows);

    store.apply_snapshot(rows, json!([{"id": 2}, {"id": 3}])).unwrap();

    assert_eq!(
        *patches.borrow(),
        vec![
            Patch::remove("/1"),
            Patch::remove("/0"),
            Patch::add("/0", json!({"id": 2})),
            Patch::add("/1", json!({"id": 3})),
        ]
    );
}

#[test]
fn nested_arrays_reconcile_recursively() {
    let t = TypeBuilder::new();
    let group = t.model("Group", [("id", t.id()), ("tags", t.arr(t.str()))]);
    let mut store = Store::new();
    let groups = store
        .create(&t.arr(group), json!([{"id": "g", "tags": ["a", "b"]}]))
        .unwrap();
    let g = store.get(groups, 0).unwrap().unwrap();
    let tags = store.field(g, "tags").unwrap();
    let first_tag = store.get(tags, 0).unwrap().unwrap();

    store.apply_snapshot(groups, json!([{"id": "g", "tags": ["z", "b", "c"]}])).unwrap();

    assert_eq!(store.get(groups, 0).unwrap(), Some(g));
    assert_eq!(store.field(g, "tags").unwrap(), tags);
    assert_eq!(store.get(tags, 0).unwrap(), Some(first_tag));
    assert_eq!(store.value(first_tag).unwrap(), &json!("z"));
    assert_eq!(store.get_path(store.get(tags, 2).unwrap().unwrap()).unwrap(), "/0/tags/2");
}

#[test]
fn records_move_between_sibling_containers_by_identifier() {
    let t = TypeBuilder::new();
    let member = t.model("Member", [("id", t.id())]);
    let group = t.model("Group", [("id", t.id()), ("members", t.arr(member))]);
    let mut store = Store::new();
    let groups = store
        .create(
            &t.arr(group),
            json!([{"id": "g1", "members": [{"id": "m"}]}, {"id": "g2", "members": []}]),
        )
        .unwrap();
    let old = store.resolve_identifier(groups, "Member", &"m".into()).unwrap().unwrap();

    store
        .apply_snapshot(
            groups,
            json!([{"id": "g1", "members": []}, {"id": "g2", "members": [{"id": "m"}]}]),
        )
        .unwrap();

    let moved = store.resolve_identifier(groups, "Member", &"m".into()).unwrap().unwrap();
    assert_eq!(moved, old);
    assert_eq!(store.root_of(moved).unwrap(), groups);
    assert_eq!(store.get_path(moved).unwrap(), "/1/members/0");
    assert_eq!(store.identifier_count(), 3);
}
