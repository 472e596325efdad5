//! Category derivation from Gmail label identifiers

use crate::models::CategoryCode;

/// Derive corpus categories from a message's label identifiers
///
/// Each category whose marker is a substring of any label is emitted once,
/// in priority order (Forums, Personal, Promotions, Social, Updates). A label
/// that happens to contain several markers sets each of them. An empty result
/// means the message has no category and is filtered out by the caller.
pub fn classify<S: AsRef<str>>(label_ids: &[S]) -> Vec<CategoryCode> {
    CategoryCode::ALL
        .iter()
        .copied()
        .filter(|category| {
            label_ids
                .iter()
                .any(|label| label.as_ref().contains(category.marker()))
        })
        .collect()
}
