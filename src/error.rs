/// Errors that can occur while operating accounts, sessions and group sessions.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// Creating a new object failed in the primitive layer.
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// Generating fresh key material failed.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// The handshake material for a pairwise session is malformed or unusable.
    #[error("Session initialization failed: {0}")]
    SessionInit(String),

    /// A group session key or export could not be turned into a session.
    #[error("Group session creation failed: {0}")]
    SessionCreation(String),

    /// A ciphertext is not in the expected wire encoding.
    #[error("Bad message format: {0}")]
    BadMessageFormat(#[from] DecodeError),

    /// A MAC, AEAD tag or message signature did not verify.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A group message is older than the oldest ratchet state still held.
    #[error("Message index {index} is below the first known index {first_known_index}")]
    IndexTooLow {
        /// Index carried by the message.
        index: u32,
        /// Lowest index the session can still decrypt.
        first_known_index: u32,
    },

    /// A pickle could not be decrypted or decoded.
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    /// The one-time key a session was created from is not held by the account.
    #[error("One-time key not found: {0}")]
    KeyNotFound(String),

    /// A detached Ed25519 signature did not verify.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// The object has already been released.
    #[error("Object has been released")]
    Released,

    /// Random number generation failed.
    #[error("Random number generation failed")]
    Random,
}

/// Reasons a blob fails to decode before any cryptography is attempted.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum DecodeError {
    /// The input is not valid unpadded base64.
    #[error("INVALID_BASE64: {0}")]
    InvalidBase64(String),

    /// The input ended before all mandatory fields were read.
    #[error("message is too short")]
    Truncated,

    /// The version byte is not one this crate understands.
    #[error("unsupported version {0}")]
    UnsupportedVersion(u8),

    /// The message type discriminator is unknown.
    #[error("unknown message type {0}")]
    UnknownMessageType(u8),

    /// A required field is missing or has the wrong length.
    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    /// The protobuf body could not be decoded.
    #[error("malformed body: {0}")]
    Body(String),

    /// The message skips further ahead than the session allows.
    #[error("message index {index} is too far ahead of chain index {current}")]
    TooFarAhead {
        /// Index the receiving chain is at.
        current: u32,
        /// Index carried by the message.
        index: u32,
    },

    /// The message key for this index was already used or dropped.
    #[error("message key for index {0} is no longer available")]
    MissingMessageKey(u32),
}

impl From<base64::DecodeError> for DecodeError {
    fn from(value: base64::DecodeError) -> Self {
        Self::InvalidBase64(value.to_string())
    }
}

impl From<prost::DecodeError> for DecodeError {
    fn from(value: prost::DecodeError) -> Self {
        Self::Body(value.to_string())
    }
}

impl From<aes_gcm_siv::Error> for Error {
    fn from(value: aes_gcm_siv::Error) -> Self {
        Self::Authentication(value.to_string())
    }
}
