//! Base64 payload decoding.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use thiserror::Error;

/// Standard alphabet with required padding, tolerating non-zero trailing
/// bits in the last symbol.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Why a payload could not be turned into text.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Nothing from the base64 alphabet was left.
    #[error("payload has no base64 content")]
    Empty,

    /// The decoded bytes are not valid UTF-8.
    #[error("decoded payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl DecodeError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::Base64(_) => "base64",
            DecodeError::Empty => "empty",
            DecodeError::Utf8(_) => "utf8",
        }
    }
}

/// Decode a base64 payload into document text.
///
/// Characters outside the base64 alphabet (line wrapping, stray entity
/// characters) are discarded before decoding. Padding is still required.
pub fn decode_payload(payload: &str) -> Result<String, DecodeError> {
    let compact: Vec<u8> = payload
        .bytes()
        .filter(|b| b.is_ascii_alphanumeric() || matches!(*b, b'+' | b'/' | b'='))
        .collect();
    if compact.is_empty() {
        return Err(DecodeError::Empty);
    }
    let bytes = LENIENT.decode(&compact)?;
    Ok(String::from_utf8(bytes)?)
}
