use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;

use super::types::DecodeError;

/// Decode a standard-alphabet, padded base64 string into raw bytes.
///
/// Leading and trailing whitespace is ignored; anything else outside the
/// alphabet, or bad padding, is `DecodeError::InvalidEncoding`.
pub fn decode_base64(input: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(BASE64_STANDARD.decode(input.trim())?)
}
