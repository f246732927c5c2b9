//! Content decoder for transport-encoded file bodies
//!
//! The contents API returns file bodies base64-encoded and wrapped at 60
//! columns. Oversized files come back with encoding `none` and no content.

use crate::model::{DecodedFile, FileBody};
use crate::DecodeError;
use base64::{engine::general_purpose, Engine as _};

/// Decodes a fetched file body into a [`DecodedFile`] for `path`
pub fn decode_file(path: &str, body: &FileBody) -> Result<DecodedFile, DecodeError> {
    Ok(DecodedFile {
        path: path.to_string(),
        text: decode_body(body)?,
    })
}

/// Decodes a fetched file body to UTF-8 text
///
/// A missing encoding field is treated as base64.
pub fn decode_body(body: &FileBody) -> Result<String, DecodeError> {
    match body.encoding.as_deref() {
        None | Some("base64") => {}
        Some(other) => return Err(DecodeError::UnsupportedEncoding(other.to_string())),
    }

    let content = body.content.as_deref().ok_or(DecodeError::MissingContent)?;
    decode(content)
}

/// Decodes base64 text, ignoring embedded whitespace and a leading byte order mark
pub fn decode(encoded: &str) -> Result<String, DecodeError> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Err(DecodeError::MissingContent);
    }

    let bytes = general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| DecodeError::InvalidBase64(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;

    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}
