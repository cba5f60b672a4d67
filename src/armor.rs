//! Text transport for envelopes
//!
//! Text-mode artifacts are the raw envelope bytes in standard, padded
//! base64, the same thing a browser's `btoa` produces. No extra prefix is
//! added; the envelope magic already identifies the format.

use crate::error::{ErrorCategory, ErrorKind, Result, SvpError};
use base64::{Engine, engine::general_purpose::STANDARD};

/// Wrap envelope bytes for a text field.
pub fn wrap(body: &[u8]) -> String {
    STANDARD.encode(body)
}

/// Unwrap a text-mode artifact, returning the envelope bytes.
///
/// ASCII whitespace anywhere in the input is ignored, so artifacts that
/// picked up line breaks in transit still decode.
pub fn unwrap(armored: &str) -> Result<Vec<u8>> {
    let compact: String = armored
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    if compact.is_empty() {
        return Err(SvpError::format(
            ErrorKind::NotAnEnvelope,
            "no encrypted text supplied",
        ));
    }

    STANDARD.decode(compact.as_bytes()).map_err(|e| {
        SvpError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::ArmoringDecode,
            "base64 decoding failed",
            e,
        )
    })
}
