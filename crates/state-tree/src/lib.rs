//! A typed, in-memory state tree.
//!
//! Values are instantiated against [`TypeDef`] descriptors into trees of
//! nodes held by a [`Store`]. Every mutation (array splices, map writes,
//! snapshot application, patch application) reconciles the incoming data
//! against the live nodes so that node identity is preserved wherever an
//! identifier or position allows it, keeps node paths current and reports
//! the change as structural [`Patch`]es to listeners.
//!
//! ```
//! use serde_json::json;
//! use state_tree::{Patch, Store, TypeBuilder};
//!
//! let t = TypeBuilder::new();
//! let todo = t.model("Todo", [("id", t.id()), ("title", t.str())]);
//! let mut store = Store::new();
//! let list = store.create(&t.arr(todo), json!([{"id": "a", "title": "one"}])).unwrap();
//! let first = store.get(list, 0).unwrap().unwrap();
//!
//! // Same identifier: the node is kept and updated in place.
//! store.apply_snapshot(list, json!([{"id": "a", "title": "uno"}])).unwrap();
//! assert_eq!(store.get(list, 0).unwrap(), Some(first));
//!
//! store.apply_patch(list, &Patch::add("/-", json!({"id": "b", "title": "two"}))).unwrap();
//! assert_eq!(store.len(list).unwrap(), 2);
//! assert_eq!(store.get_path(store.get(list, 1).unwrap().unwrap()).unwrap(), "/1");
//! ```

mod array;
mod error;
mod listener;
mod map;
mod model;
mod node;
mod options;
mod path;
pub mod patch;
mod reconcile;
mod registry;
mod snapshot;
mod store;
pub mod types;

pub use error::{TreeError, TreeResult};
pub use listener::{ListenerId, PatchListener, SnapshotListener};
pub use node::{ChildKey, NodeId, NodeKind};
pub use options::StoreOptions;
pub use patch::Patch;
pub use store::{Input, Store};
pub use types::{Identifier, TypeBuilder, TypeDef, TypeRef};
