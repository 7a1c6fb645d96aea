use crate::error::DecodeError;
use crate::proto::GroupMessageProto;
use crate::types::{Ed25519Keypair, Ed25519Signature, SIGNATURE_LENGTH};
use prost::Message as _;

pub(crate) const VERSION: u8 = 3;

/// A group ciphertext: `version || body || signature`, where the signature
/// covers everything before it.
pub(crate) struct GroupMessage {
    pub(crate) message_index: u32,
    pub(crate) ciphertext: Vec<u8>,
    pub(crate) signature: Ed25519Signature,
    signed_bytes: Vec<u8>,
}

impl GroupMessage {
    /// Associated data bound to the ciphertext: the version byte and the
    /// big-endian message index.
    pub(crate) fn associated_data(message_index: u32) -> [u8; 5] {
        let mut aad = [0u8; 5];
        aad[0] = VERSION;
        aad[1..].copy_from_slice(&message_index.to_be_bytes());
        aad
    }

    /// Builds and signs the wire form of a message.
    pub(crate) fn encode(
        message_index: u32,
        ciphertext: Vec<u8>,
        signing_key: &Ed25519Keypair,
    ) -> Vec<u8> {
        let body = GroupMessageProto {
            message_index,
            ciphertext,
        };

        let mut bytes = Vec::with_capacity(1 + body.encoded_len() + SIGNATURE_LENGTH);
        bytes.push(VERSION);
        bytes.extend_from_slice(&body.encode_to_vec());

        let signature = signing_key.sign(&bytes);
        bytes.extend_from_slice(&signature.to_bytes());
        bytes
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < 1 + SIGNATURE_LENGTH {
            return Err(DecodeError::Truncated);
        }
        if bytes[0] != VERSION {
            return Err(DecodeError::UnsupportedVersion(bytes[0]));
        }

        let (signed_bytes, signature) = bytes.split_at(bytes.len() - SIGNATURE_LENGTH);
        let body = GroupMessageProto::decode(&signed_bytes[1..])?;
        if body.ciphertext.is_empty() {
            return Err(DecodeError::InvalidField("ciphertext"));
        }

        Ok(Self {
            message_index: body.message_index,
            ciphertext: body.ciphertext,
            signature: Ed25519Signature::from_slice(signature)?,
            signed_bytes: signed_bytes.to_vec(),
        })
    }

    /// The bytes covered by [`GroupMessage::signature`].
    pub(crate) fn signed_bytes(&self) -> &[u8] {
        &self.signed_bytes
    }
}
