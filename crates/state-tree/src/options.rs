//! Store configuration.

use serde::{Deserialize, Serialize};

/// Options for a [`Store`](crate::Store).
///
/// Deserializable, so it can live in an application's config file:
///
/// ```
/// let opts: state_tree::StoreOptions =
///     serde_json::from_str(r#"{"skip_unchanged_replace": false}"#).unwrap();
/// assert!(!opts.skip_unchanged_replace);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// If true, an array slot or scalar whose snapshot is unchanged by an
    /// operation produces no `replace` patch. If false, every overwritten
    /// slot is reported.
    pub skip_unchanged_replace: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { skip_unchanged_replace: true }
    }
}
