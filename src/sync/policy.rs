//! Blueprint list extraction from subject annotations.

use std::collections::BTreeMap;

use crate::models::BLUEPRINT_ANNOTATION;

/// Policies requested by a subject, in annotation order.
///
/// The value of [`BLUEPRINT_ANNOTATION`] is split on `,`. Segments are kept
/// verbatim (no whitespace trimming) and duplicates survive; empty segments
/// are dropped. A missing or empty annotation yields no policies.
pub fn extract_policies(annotations: &BTreeMap<String, String>) -> Vec<String> {
    let Some(value) = annotations.get(BLUEPRINT_ANNOTATION) else {
        return Vec::new();
    };

    value
        .split(',')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}
