//! Pointer validation.

use crate::PointerError;

/// Maximum number of segments a pointer may have.
pub const MAX_POINTER_DEPTH: usize = 256;

/// Validates a pointer string.
///
/// ```
/// use state_tree_pointer::validate_pointer;
///
/// validate_pointer("").unwrap();
/// validate_pointer("/todos/0").unwrap();
/// validate_pointer("todos").unwrap_err();
/// ```
pub fn validate_pointer(pointer: &str) -> Result<(), PointerError> {
    if pointer.is_empty() {
        return Ok(());
    }
    if !pointer.starts_with('/') {
        return Err(PointerError::PointerInvalid(pointer.to_string()));
    }
    if pointer.bytes().filter(|&b| b == b'/').count() > MAX_POINTER_DEPTH {
        return Err(PointerError::PointerTooDeep);
    }
    let mut rest = pointer;
    while let Some(pos) = rest.find('~') {
        match rest.as_bytes().get(pos + 1) {
            Some(b'0') | Some(b'1') => rest = &rest[pos + 2..],
            _ => return Err(PointerError::PointerInvalid(pointer.to_string())),
        }
    }
    Ok(())
}
