//! Pointer paths (RFC 6901 style) used to address nodes of a state tree.
//!
//! A node path is a `/`-delimited list of segments rooted at some node of the
//! tree. Segments are either array indices (`/0`, `/12`) or escaped
//! model/map keys (`/todos`, `/a~1b`). The root itself has the empty path.
//!
//! # Example
//!
//! ```
//! use state_tree_pointer::{append_index, append_key, parse_pointer, relative};
//!
//! let todos = append_key("", "todos");
//! let first = append_index(&todos, 0);
//! assert_eq!(first, "/todos/0");
//! assert_eq!(parse_pointer(&first).unwrap(), vec!["todos", "0"]);
//! assert_eq!(relative("/todos", &first), Some("/0"));
//! ```

use thiserror::Error;

pub mod validate;
pub use validate::{validate_pointer, MAX_POINTER_DEPTH};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PointerError {
    #[error("POINTER_INVALID: {0}")]
    PointerInvalid(String),
    #[error("POINTER_TOO_DEEP")]
    PointerTooDeep,
    #[error("INVALID_INDEX: {0}")]
    InvalidIndex(String),
    #[error("INDEX_OUT_OF_BOUNDS: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Unescapes a pointer segment: `~1` becomes `/`, then `~0` becomes `~`.
///
/// ```
/// use state_tree_pointer::unescape_segment;
///
/// assert_eq!(unescape_segment("a~0b"), "a~b");
/// assert_eq!(unescape_segment("c~1d"), "c/d");
/// ```
pub fn unescape_segment(segment: &str) -> String {
    if !segment.contains('~') {
        return segment.to_string();
    }
    segment.replace("~1", "/").replace("~0", "~")
}

/// Escapes a key so it can be used as a single pointer segment.
///
/// ```
/// use state_tree_pointer::escape_segment;
///
/// assert_eq!(escape_segment("a~b"), "a~0b");
/// assert_eq!(escape_segment("c/d"), "c~1d");
/// ```
pub fn escape_segment(key: &str) -> String {
    if !key.contains('/') && !key.contains('~') {
        return key.to_string();
    }
    key.replace('~', "~0").replace('/', "~1")
}

/// Parses a pointer into unescaped segments.
///
/// The empty pointer addresses the root and yields no segments. Any other
/// pointer must start with `/`.
///
/// ```
/// use state_tree_pointer::parse_pointer;
///
/// assert_eq!(parse_pointer("").unwrap(), Vec::<String>::new());
/// assert_eq!(parse_pointer("/0/to").unwrap(), vec!["0", "to"]);
/// assert!(parse_pointer("0/to").is_err());
/// ```
pub fn parse_pointer(pointer: &str) -> Result<Vec<String>, PointerError> {
    validate_pointer(pointer)?;
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    Ok(pointer[1..].split('/').map(unescape_segment).collect())
}

/// Appends an (unescaped) key segment to a pointer.
pub fn append_key(base: &str, key: &str) -> String {
    let escaped = escape_segment(key);
    let mut out = String::with_capacity(base.len() + escaped.len() + 1);
    out.push_str(base);
    out.push('/');
    out.push_str(&escaped);
    out
}

/// Appends an array index segment to a pointer.
pub fn append_index(base: &str, index: usize) -> String {
    format!("{base}/{index}")
}

/// Returns true if `segment` is a canonical array index: digits only, no
/// leading zero unless it is `0` itself.
///
/// ```
/// use state_tree_pointer::is_index;
///
/// assert!(is_index("0"));
/// assert!(is_index("42"));
/// assert!(!is_index("01"));
/// assert!(!is_index("-1"));
/// assert!(!is_index("-"));
/// ```
pub fn is_index(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    if bytes.is_empty() || (bytes.len() > 1 && bytes[0] == b'0') {
        return false;
    }
    bytes.iter().all(u8::is_ascii_digit)
}

/// Resolves an array segment against a container of length `len`.
///
/// Existing slots are `0..len`. With `allow_end` set, `len` itself and the
/// `-` segment are accepted too and resolve to the append position.
///
/// ```
/// use state_tree_pointer::parse_index;
///
/// assert_eq!(parse_index("1", 3, false).unwrap(), 1);
/// assert_eq!(parse_index("-", 3, true).unwrap(), 3);
/// assert!(parse_index("3", 3, false).is_err());
/// assert_eq!(parse_index("3", 3, true).unwrap(), 3);
/// ```
pub fn parse_index(segment: &str, len: usize, allow_end: bool) -> Result<usize, PointerError> {
    if segment == "-" {
        return if allow_end {
            Ok(len)
        } else {
            Err(PointerError::IndexOutOfBounds { index: len, len })
        };
    }
    if !is_index(segment) {
        return Err(PointerError::InvalidIndex(segment.to_string()));
    }
    let index: usize = segment
        .parse()
        .map_err(|_| PointerError::InvalidIndex(segment.to_string()))?;
    let limit = if allow_end { len + 1 } else { len };
    if index >= limit {
        return Err(PointerError::IndexOutOfBounds { index, len });
    }
    Ok(index)
}

/// Returns the part of `path` below `base`, or `None` if `path` is not
/// within `base`. The result is itself a pointer (empty when equal).
///
/// ```
/// use state_tree_pointer::relative;
///
/// assert_eq!(relative("", "/a/0"), Some("/a/0"));
/// assert_eq!(relative("/a", "/a"), Some(""));
/// assert_eq!(relative("/a/1", "/a/10"), None);
/// ```
pub fn relative<'a>(base: &str, path: &'a str) -> Option<&'a str> {
    let rest = path.strip_prefix(base)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}
