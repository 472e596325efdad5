//! Primary body part selection and base64url decoding

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use tracing::debug;

use crate::models::BodyPart;

/// Gmail emits base64url both with and without padding
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Maximum depth for MIME tree traversal
const MAX_MIME_DEPTH: usize = 50;

/// Part id of the primary part in the positional layout
pub const PRIMARY_PART_ID: &str = "0";

/// How the primary body part of a message is located
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyStrategy {
    /// First `text/plain` part anywhere in the MIME tree, falling back to
    /// the top-level part with id `"0"`
    FirstTextPlain,
    /// Top-level part with exactly this part id
    PartId(String),
}

impl Default for BodyStrategy {
    fn default() -> Self {
        BodyStrategy::FirstTextPlain
    }
}

/// Decode the primary body part into trimmed plain text
///
/// Returns `None` when no part is selected, when the payload is not valid
/// base64url, or when the trimmed text is empty.
pub fn decode_body(parts: &[BodyPart], strategy: &BodyStrategy) -> Option<String> {
    let part = select_primary_part(parts, strategy)?;
    let data = part.encoded_data.as_deref().unwrap_or_default();

    let text = match decode_base64url(data) {
        Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        None => {
            debug!("Body part {} is not valid base64url, treating as empty", part.part_id);
            String::new()
        }
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Pick the part that holds the message body
pub fn select_primary_part<'a>(parts: &'a [BodyPart], strategy: &BodyStrategy) -> Option<&'a BodyPart> {
    match strategy {
        BodyStrategy::PartId(id) => find_by_part_id(parts, id),
        BodyStrategy::FirstTextPlain => find_text_plain(parts, 0)
            .or_else(|| find_by_part_id(parts, PRIMARY_PART_ID)),
    }
}

fn find_by_part_id<'a>(parts: &'a [BodyPart], id: &str) -> Option<&'a BodyPart> {
    parts.iter().find(|part| part.part_id == id)
}

fn find_text_plain(parts: &[BodyPart], depth: usize) -> Option<&BodyPart> {
    if depth > MAX_MIME_DEPTH {
        return None;
    }

    for part in parts {
        if part.is_mime("text/plain") && part.encoded_data.is_some() {
            return Some(part);
        }
        if let Some(found) = find_text_plain(&part.parts, depth + 1) {
            return Some(found);
        }
    }
    None
}

/// Decode base64url data, padded or not
pub fn decode_base64url(data: &str) -> Option<Vec<u8>> {
    URL_SAFE_LENIENT.decode(data.trim()).ok()
}

/// Encode bytes as unpadded base64url, the form Gmail uses on the wire
pub fn encode_base64url(bytes: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
