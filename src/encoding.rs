use crate::error::DecodeError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;

/// Encodes bytes as unpadded standard base64, the encoding of every public blob.
pub(crate) fn encode(bytes: impl AsRef<[u8]>) -> String {
    STANDARD_NO_PAD.encode(bytes)
}

/// Decodes unpadded standard base64.
pub(crate) fn decode(input: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(STANDARD_NO_PAD.decode(input)?)
}

/// Decodes a base64 string that must hold exactly `N` bytes.
pub(crate) fn decode_array<const N: usize>(
    input: &str,
    field: &'static str,
) -> Result<[u8; N], DecodeError> {
    let bytes = decode(input)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| DecodeError::InvalidField(field))
}
