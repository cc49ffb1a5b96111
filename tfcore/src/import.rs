//! Import helpers for resource import implementations
//!
//! Resource IDs on multi-tenant platforms are composite strings built from
//! parent identifiers joined with '/'. The helpers here parse and rebuild
//! those IDs; a wrong segment count is rejected before any network call is
//! made.

use crate::context::Context;
use crate::error::{Result, TfcoreError};
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, DynamicValue};

/// Split a composite import ID into exactly `expected` segments.
///
/// Segment order is fixed per resource type; empty segments are invalid
/// (they would round-trip to a different string).
pub fn split_composite_id(id: &str, expected: usize) -> Result<Vec<String>> {
    let parts: Vec<&str> = id.split('/').collect();

    if parts.len() != expected {
        return Err(TfcoreError::ImportFailed(format!(
            "expected {} '/'-separated segments, got {} in {:?}",
            expected,
            parts.len(),
            id
        )));
    }
    if parts.iter().any(|p| p.is_empty()) {
        return Err(TfcoreError::ImportFailed(format!(
            "import ID {:?} contains an empty segment",
            id
        )));
    }

    Ok(parts.into_iter().map(str::to_string).collect())
}

/// Rebuild a composite ID from its segments. Inverse of split_composite_id.
pub fn join_composite_id(segments: &[&str]) -> String {
    segments.join("/")
}

/// Sets the import ID to a single attribute in state.
///
/// For simple resources whose import ID maps directly onto one attribute,
/// e.g. ID "env-abc123" -> state.id = "env-abc123".
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::empty();

    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!(
                    "Could not set attribute '{:?}' to value '{}'",
                    attr_path, request.id
                ),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_accepts_exact_segment_count() {
        let parts = split_composite_id("env-1/lkc-2/topic-3", 3).unwrap();
        assert_eq!(parts, vec!["env-1", "lkc-2", "topic-3"]);
    }

    #[test]
    fn split_rejects_wrong_segment_count() {
        assert!(split_composite_id("env-1/lkc-2", 3).is_err());
        assert!(split_composite_id("env-1/lkc-2/topic-3/extra", 3).is_err());
        assert!(split_composite_id("env-1", 2).is_err());
    }

    #[test]
    fn split_rejects_empty_segments() {
        assert!(split_composite_id("env-1//topic-3", 3).is_err());
        assert!(split_composite_id("/lkc-2", 2).is_err());
    }

    #[test]
    fn split_and_join_round_trip() {
        let original = "env-x7/lkc-9q/my-connector";
        let parts = split_composite_id(original, 3).unwrap();
        let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
        assert_eq!(join_composite_id(&refs), original);
    }

    #[test]
    fn passthrough_sets_id_attribute() {
        let request = ImportResourceStateRequest {
            type_name: "cascade_environment".to_string(),
            id: "env-abc123".to_string(),
        };
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        import_state_passthrough_id(
            &Context::new(),
            AttributePath::new("id"),
            &request,
            &mut response,
        );

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.imported_resources.len(), 1);
        let state = &response.imported_resources[0].state;
        assert_eq!(
            state.get_string(&AttributePath::new("id")).unwrap(),
            "env-abc123"
        );
    }
}
