use super::MESSAGE_KEY_INFO;
use super::message::GroupMessage;
use super::ratchet::MegolmRatchet;
use super::session_key::encode_session_key;
use crate::Error;
use crate::crypto;
use crate::encoding;
use crate::types::Ed25519Keypair;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// The sending side of a group session.
///
/// Every message is encrypted with a key derived from the current Megolm
/// ratchet state, signed with the session's Ed25519 key, and the ratchet then
/// moves forward by one.
pub struct OutboundGroupSession {
    pub(crate) ratchet: MegolmRatchet,
    pub(crate) signing_key: Ed25519Keypair,
    pub(crate) session_key: Zeroizing<Vec<u8>>,
}

impl OutboundGroupSession {
    pub fn new() -> Result<Self, Error> {
        let ratchet = MegolmRatchet::new().map_err(|err| Error::Initialization(err.to_string()))?;
        let signing_key =
            Ed25519Keypair::new().map_err(|err| Error::Initialization(err.to_string()))?;
        let session_key = encode_session_key(&ratchet, &signing_key);

        let session = Self {
            ratchet,
            signing_key,
            session_key,
        };
        debug!(session_id = %session.session_id(), "created outbound group session");

        Ok(session)
    }

    /// Base64 of the session's Ed25519 public key.
    pub fn session_id(&self) -> String {
        self.signing_key.public_key().to_base64()
    }

    /// The signed ratchet state at index 0, to be shared with every recipient.
    ///
    /// The same key is returned no matter how many messages were sent.
    pub fn session_key(&self) -> String {
        encoding::encode(self.session_key.as_slice())
    }

    /// Index the next message will be encrypted at.
    pub fn message_index(&self) -> u32 {
        self.ratchet.index()
    }

    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<String, Error> {
        let message_index = self.ratchet.index();
        let ciphertext = crypto::encrypt(
            self.ratchet.to_bytes().as_slice(),
            MESSAGE_KEY_INFO,
            plaintext,
            &GroupMessage::associated_data(message_index),
        )?;

        let mut ratchet = self.ratchet.clone();
        ratchet.advance()?;

        let message = GroupMessage::encode(message_index, ciphertext, &self.signing_key);
        self.ratchet = ratchet;

        Ok(encoding::encode(message))
    }
}

impl Zeroize for OutboundGroupSession {
    fn zeroize(&mut self) {
        self.ratchet.zeroize();
        self.signing_key.zeroize();
        self.session_key.zeroize();
    }
}

impl ZeroizeOnDrop for OutboundGroupSession {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_index_increments() {
        let mut session = OutboundGroupSession::new().unwrap();
        assert_eq!(session.message_index(), 0);

        for expected in 1..=5 {
            session.encrypt(b"Hello").unwrap();
            assert_eq!(session.message_index(), expected);
        }
    }

    #[test]
    fn test_session_key_is_idempotent() {
        let mut session = OutboundGroupSession::new().unwrap();
        let session_key = session.session_key();

        session.encrypt(b"Hello").unwrap();
        assert_eq!(session.session_key(), session_key);
        assert_eq!(session.message_index(), 1);
    }

    #[test]
    fn test_sessions_are_unique() {
        let a = OutboundGroupSession::new().unwrap();
        let b = OutboundGroupSession::new().unwrap();

        assert_ne!(a.session_id(), b.session_id());
        assert_ne!(a.session_key(), b.session_key());
    }

    #[test]
    fn test_ciphertexts_differ_per_index() {
        let mut session = OutboundGroupSession::new().unwrap();

        assert_ne!(session.encrypt(b"same").unwrap(), session.encrypt(b"same").unwrap());
    }
}
