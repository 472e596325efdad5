//! Header extraction for corpus records

use crate::models::{ExtractedHeaders, Header};

/// Pull Date, From and Subject out of a header list
///
/// Names match exactly and case-sensitively. Headers are visited in order,
/// so the last occurrence of a duplicated name wins.
pub fn extract_headers(headers: &[Header]) -> ExtractedHeaders {
    let mut extracted = ExtractedHeaders::default();

    for header in headers {
        let slot = match header.name.as_str() {
            "Date" => &mut extracted.date,
            "From" => &mut extracted.from,
            "Subject" => &mut extracted.subject,
            _ => continue,
        };
        *slot = Some(header.value.clone());
    }

    extracted
}
