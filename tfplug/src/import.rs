//! Import helpers for simplifying resource import implementations

use crate::request::ImportStateResponse;
use crate::types::{Diagnostics, State};

/// Sets the import ID to a single attribute in state.
///
/// Example: ID "primary" -> state.name = "primary"
pub fn import_state_passthrough_id(attribute: &str, id: &str) -> ImportStateResponse {
    let mut state = State::new();
    state.set(attribute, id);

    ImportStateResponse {
        state: Some(state),
        diagnostics: Diagnostics::new(),
    }
}

/// Splits a composite import ID into exactly `attributes.len()` non-empty
/// parts and assigns them in order.
///
/// Example: ID "dzd_123,env_456" with separator "," and attributes
/// `["domain_identifier", "id"]`.
pub fn import_state_composite_id(
    id: &str,
    separator: &str,
    attributes: &[&str],
) -> ImportStateResponse {
    match split_id(id, separator, attributes.len()) {
        Some(parts) => {
            let mut state = State::new();
            for (attribute, part) in attributes.iter().zip(parts) {
                state.set(attribute, part);
            }
            ImportStateResponse {
                state: Some(state),
                diagnostics: Diagnostics::new(),
            }
        }
        None => {
            let mut diagnostics = Diagnostics::new();
            diagnostics.add_error(
                "Unexpected Import Identifier",
                Some(format!(
                    "Expected import identifier with format: {}. Got: {:?}",
                    attributes.join(separator),
                    id
                )),
            );
            ImportStateResponse {
                state: None,
                diagnostics,
            }
        }
    }
}

/// Splits `id` into exactly `count` non-empty parts.
pub fn split_id(id: &str, separator: &str, count: usize) -> Option<Vec<String>> {
    let parts: Vec<String> = id.split(separator).map(str::to_string).collect();
    if parts.len() != count || parts.iter().any(String::is_empty) {
        return None;
    }
    Some(parts)
}
