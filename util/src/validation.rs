//! Shared helpers for turning `validator` failures into response messages.

use validator::ValidationErrors;

/// Flattens every field message in `errors` into a single `;`-joined string.
///
/// Only errors that carry an explicit `message` are included, so derive
/// attributes should always set one.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| {
            errs.iter()
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        })
        .collect::<Vec<_>>()
        .join("; ")
}
