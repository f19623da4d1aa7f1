//! Structural patches: the type, its JSON wire codec and application onto a
//! subtree.

mod apply;
pub mod codec;
mod types;

pub use codec::{from_json, from_json_patch, to_json, to_json_patch};
pub use types::Patch;
