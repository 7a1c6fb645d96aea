use super::MESSAGE_KEY_INFO;
use super::message::GroupMessage;
use super::ratchet::MegolmRatchet;
use super::session_key::{RatchetSnapshot, decode_export, decode_session_key, encode_export};
use crate::Error;
use crate::crypto;
use crate::encoding;
use crate::types::Ed25519PublicKey;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Plaintext of a group message and the index it was sent at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptedMessage {
    pub plaintext: Vec<u8>,
    pub message_index: u32,
}

/// The receiving side of a group session.
///
/// Keeps the ratchet at the first index it can decrypt, plus the furthest
/// point it has advanced to, so in-order traffic never rehashes from the
/// start.
pub struct InboundGroupSession {
    pub(crate) initial_ratchet: MegolmRatchet,
    pub(crate) latest_ratchet: MegolmRatchet,
    pub(crate) signing_key: Ed25519PublicKey,
    pub(crate) verified: bool,
}

impl InboundGroupSession {
    /// Creates a session from a session key published by the sender.
    ///
    /// Such a session is verified: the key is signed by the session's own
    /// Ed25519 key.
    pub fn new(session_key: &str) -> Result<Self, Error> {
        let session = Self::from_snapshot(decode_session_key(session_key)?, true);
        debug!(
            session_id = %session.session_id(),
            first_known_index = session.first_known_index(),
            "created inbound group session"
        );
        Ok(session)
    }

    /// Creates a session from the output of [`InboundGroupSession::export_at`].
    ///
    /// Imported sessions are never verified, however they were obtained.
    pub fn import(exported: &str) -> Result<Self, Error> {
        let session = Self::from_snapshot(decode_export(exported)?, false);
        debug!(
            session_id = %session.session_id(),
            first_known_index = session.first_known_index(),
            "imported inbound group session"
        );
        Ok(session)
    }

    fn from_snapshot(snapshot: RatchetSnapshot, verified: bool) -> Self {
        Self {
            latest_ratchet: snapshot.ratchet.clone(),
            initial_ratchet: snapshot.ratchet,
            signing_key: snapshot.signing_key,
            verified,
        }
    }

    /// Base64 of the sender's Ed25519 key, equal to the outbound session id.
    pub fn session_id(&self) -> String {
        self.signing_key.to_base64()
    }

    pub fn first_known_index(&self) -> u32 {
        self.initial_ratchet.index()
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// Decrypts a base64 group message.
    ///
    /// Fails with [`Error::BadMessageFormat`] for input that is not a group
    /// message at all, [`Error::Authentication`] when the signature or the
    /// ciphertext does not verify and [`Error::IndexTooLow`] for messages
    /// sent before [`InboundGroupSession::first_known_index`].
    pub fn decrypt(&mut self, message: &str) -> Result<DecryptedMessage, Error> {
        self.try_decrypt(message).inspect_err(|err| {
            warn!(session_id = %self.session_id(), error = %err, "failed to decrypt group message");
        })
    }

    fn try_decrypt(&mut self, message: &str) -> Result<DecryptedMessage, Error> {
        let message = GroupMessage::decode(&encoding::decode(message)?)?;

        self.signing_key
            .verify(message.signed_bytes(), &message.signature)
            .map_err(|_| Error::Authentication("group message signature mismatch".to_string()))?;

        let ratchet = self.ratchet_at(message.message_index)?;
        let plaintext = crypto::decrypt(
            ratchet.to_bytes().as_slice(),
            MESSAGE_KEY_INFO,
            &message.ciphertext,
            &GroupMessage::associated_data(message.message_index),
        )?;

        if ratchet.index() > self.latest_ratchet.index() {
            self.latest_ratchet = ratchet;
        }

        Ok(DecryptedMessage {
            plaintext,
            message_index: message.message_index,
        })
    }

    /// A copy of the ratchet advanced to `index`, starting from the closest
    /// stored state at or below it.
    fn ratchet_at(&self, index: u32) -> Result<MegolmRatchet, Error> {
        let first_known_index = self.first_known_index();
        if index < first_known_index {
            return Err(Error::IndexTooLow {
                index,
                first_known_index,
            });
        }

        let mut ratchet = if index >= self.latest_ratchet.index() {
            self.latest_ratchet.clone()
        } else {
            self.initial_ratchet.clone()
        };
        ratchet.advance_to(index)?;

        Ok(ratchet)
    }

    /// Exports the session as of `index` for [`InboundGroupSession::import`].
    ///
    /// The export cannot decrypt anything sent before `index`.
    pub fn export_at(&self, index: u32) -> Result<String, Error> {
        let ratchet = self.ratchet_at(index)?;
        Ok(encoding::encode(
            encode_export(&ratchet, &self.signing_key).as_slice(),
        ))
    }
}

impl Zeroize for InboundGroupSession {
    fn zeroize(&mut self) {
        self.initial_ratchet.zeroize();
        self.latest_ratchet.zeroize();
        self.verified = false;
    }
}

impl ZeroizeOnDrop for InboundGroupSession {}
