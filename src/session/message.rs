use crate::encoding;
use crate::error::DecodeError;
use crate::proto::{MessageProto, PreKeyMessageProto};
use crate::types::X25519PublicKey;
use prost::Message as _;

/// Version byte carried by every pairwise message.
pub(crate) const VERSION: u8 = 3;

/// Discriminator of the two pairwise message kinds on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageType {
    /// Carries the handshake material needed to create an inbound session.
    PreKey = 0,
    /// A ratchet-only message.
    Normal = 1,
}

impl TryFrom<u8> for MessageType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::PreKey),
            1 => Ok(Self::Normal),
            other => Err(DecodeError::UnknownMessageType(other)),
        }
    }
}

/// A ratchet message: the current ratchet key of the sender, the position in
/// the sender's chain and the authenticated ciphertext.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub(crate) ratchet_key: X25519PublicKey,
    pub(crate) chain_index: u32,
    pub(crate) ciphertext: Vec<u8>,
}

impl Message {
    pub fn ratchet_key(&self) -> X25519PublicKey {
        self.ratchet_key
    }

    pub fn chain_index(&self) -> u32 {
        self.chain_index
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Associated data bound to the ciphertext: the version byte, the ratchet
    /// key and the big-endian chain index.
    pub(crate) fn associated_data(ratchet_key: &X25519PublicKey, chain_index: u32) -> [u8; 37] {
        let mut aad = [0u8; 37];
        aad[0] = VERSION;
        aad[1..33].copy_from_slice(ratchet_key.as_bytes());
        aad[33..].copy_from_slice(&chain_index.to_be_bytes());
        aad
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let body = MessageProto {
            ratchet_key: self.ratchet_key.to_bytes().to_vec(),
            chain_index: self.chain_index,
            ciphertext: self.ciphertext.clone(),
        };

        let mut bytes = Vec::with_capacity(1 + body.encoded_len());
        bytes.push(VERSION);
        bytes.extend_from_slice(&body.encode_to_vec());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let body = check_version(bytes)?;
        let proto = MessageProto::decode(body)?;

        if proto.ciphertext.is_empty() {
            return Err(DecodeError::InvalidField("ciphertext"));
        }

        Ok(Self {
            ratchet_key: X25519PublicKey::from_slice(&proto.ratchet_key)?,
            chain_index: proto.chain_index,
            ciphertext: proto.ciphertext,
        })
    }
}

/// The first messages of a session, sent until the initiator hears back.
///
/// Wraps a normal [`Message`] together with the initiator's identity key,
/// the base key of the handshake and the responder's one-time key it used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreKeyMessage {
    pub(crate) one_time_key: X25519PublicKey,
    pub(crate) base_key: X25519PublicKey,
    pub(crate) identity_key: X25519PublicKey,
    pub(crate) message: Message,
}

impl PreKeyMessage {
    pub fn one_time_key(&self) -> X25519PublicKey {
        self.one_time_key
    }

    pub fn base_key(&self) -> X25519PublicKey {
        self.base_key
    }

    pub fn identity_key(&self) -> X25519PublicKey {
        self.identity_key
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let body = PreKeyMessageProto {
            one_time_key: self.one_time_key.to_bytes().to_vec(),
            base_key: self.base_key.to_bytes().to_vec(),
            identity_key: self.identity_key.to_bytes().to_vec(),
            message: self.message.to_bytes(),
        };

        let mut bytes = Vec::with_capacity(1 + body.encoded_len());
        bytes.push(VERSION);
        bytes.extend_from_slice(&body.encode_to_vec());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let body = check_version(bytes)?;
        let proto = PreKeyMessageProto::decode(body)?;

        Ok(Self {
            one_time_key: X25519PublicKey::from_slice(&proto.one_time_key)?,
            base_key: X25519PublicKey::from_slice(&proto.base_key)?,
            identity_key: X25519PublicKey::from_slice(&proto.identity_key)?,
            message: Message::from_bytes(&proto.message)?,
        })
    }
}

/// A pairwise ciphertext as exchanged between two sessions.
///
/// The external form is `base64(type || body)`, where `type` is the
/// [`MessageType`] discriminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OlmMessage {
    Normal(Message),
    PreKey(PreKeyMessage),
}

impl OlmMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Normal(_) => MessageType::Normal,
            Self::PreKey(_) => MessageType::PreKey,
        }
    }

    /// Parses a message body whose type was transported out of band.
    pub fn from_parts(message_type: MessageType, body: &[u8]) -> Result<Self, DecodeError> {
        match message_type {
            MessageType::Normal => Message::from_bytes(body).map(Self::Normal),
            MessageType::PreKey => PreKeyMessage::from_bytes(body).map(Self::PreKey),
        }
    }

    /// The message body without the type discriminator.
    pub fn body(&self) -> Vec<u8> {
        match self {
            Self::Normal(message) => message.to_bytes(),
            Self::PreKey(message) => message.to_bytes(),
        }
    }

    pub fn to_base64(&self) -> String {
        let body = self.body();

        let mut bytes = Vec::with_capacity(1 + body.len());
        bytes.push(self.message_type() as u8);
        bytes.extend_from_slice(&body);
        encoding::encode(bytes)
    }

    pub fn from_base64(input: &str) -> Result<Self, DecodeError> {
        let bytes = encoding::decode(input)?;
        let (message_type, body) = bytes.split_first().ok_or(DecodeError::Truncated)?;

        Self::from_parts(MessageType::try_from(*message_type)?, body)
    }
}

impl From<Message> for OlmMessage {
    fn from(message: Message) -> Self {
        Self::Normal(message)
    }
}

impl From<PreKeyMessage> for OlmMessage {
    fn from(message: PreKeyMessage) -> Self {
        Self::PreKey(message)
    }
}

fn check_version(bytes: &[u8]) -> Result<&[u8], DecodeError> {
    match bytes.split_first() {
        None => Err(DecodeError::Truncated),
        Some((&VERSION, body)) => Ok(body),
        Some((&version, _)) => Err(DecodeError::UnsupportedVersion(version)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> Message {
        Message {
            ratchet_key: X25519PublicKey::from([7u8; 32]),
            chain_index: 42,
            ciphertext: vec![1, 2, 3, 4],
        }
    }

    #[test]
    fn test_message_wire_layout() {
        let bytes = sample_message().to_bytes();

        assert_eq!(bytes[0], VERSION);
        // Field 1, length-delimited, 32 bytes.
        assert_eq!(&bytes[1..3], &[0x0A, 32]);
        assert_eq!(Message::from_bytes(&bytes).unwrap(), sample_message());
    }

    #[test]
    fn test_olm_message_carries_type() {
        let pre_key = PreKeyMessage {
            one_time_key: X25519PublicKey::from([1u8; 32]),
            base_key: X25519PublicKey::from([2u8; 32]),
            identity_key: X25519PublicKey::from([3u8; 32]),
            message: sample_message(),
        };

        let encoded = OlmMessage::from(pre_key.clone()).to_base64();
        let decoded = OlmMessage::from_base64(&encoded).unwrap();

        assert_eq!(decoded.message_type(), MessageType::PreKey);
        assert_eq!(decoded, OlmMessage::PreKey(pre_key));
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert_eq!(Message::from_bytes(&[]), Err(DecodeError::Truncated));
        assert_eq!(
            Message::from_bytes(&[2, 0, 0]),
            Err(DecodeError::UnsupportedVersion(2))
        );
        assert_eq!(
            OlmMessage::from_base64(&encoding::encode([9u8, VERSION])),
            Err(DecodeError::UnknownMessageType(9))
        );
        assert!(matches!(
            OlmMessage::from_base64("not base64!"),
            Err(DecodeError::InvalidBase64(_))
        ));

        let mut no_ciphertext = sample_message();
        no_ciphertext.ciphertext.clear();
        assert_eq!(
            Message::from_bytes(&no_ciphertext.to_bytes()),
            Err(DecodeError::InvalidField("ciphertext"))
        );
    }
}
