pub(crate) mod message;

pub use message::{Message, MessageType, OlmMessage, PreKeyMessage};

use crate::Error;
use crate::config::SessionConfig;
use crate::crypto::sha256;
use crate::encoding;
use crate::ratchet::DoubleRatchet;
use crate::types::X25519PublicKey;
use crate::x3dh::X3DHSharedSecret;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Public keys of the handshake a session was created from.
///
/// All three are public, so both ends hold identical copies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionKeys {
    /// Identity key of the initiator.
    pub identity_key: X25519PublicKey,
    /// Base key the initiator generated for the handshake.
    pub base_key: X25519PublicKey,
    /// One-time key of the responder that the handshake consumed.
    pub one_time_key: X25519PublicKey,
}

impl SessionKeys {
    /// `base64(SHA-256(identity_key || base_key || one_time_key))`
    pub(crate) fn session_id(&self) -> String {
        let mut transcript = [0u8; 96];
        transcript[0..32].copy_from_slice(self.identity_key.as_bytes());
        transcript[32..64].copy_from_slice(self.base_key.as_bytes());
        transcript[64..96].copy_from_slice(self.one_time_key.as_bytes());

        encoding::encode(sha256(&transcript))
    }

    fn matches(&self, message: &PreKeyMessage) -> bool {
        self.identity_key == message.identity_key
            && self.base_key == message.base_key
            && self.one_time_key == message.one_time_key
    }
}

/// Which end of the handshake a session was created on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Claimed the peer's one-time key and sent the first message.
    Initiator,
    /// Was contacted through one of its own one-time keys.
    Responder,
}

/// A pairwise double ratchet session.
///
/// Created through [`Account::create_outbound_session`] or
/// [`Account::create_inbound_session`]. The session holds copies of all key
/// material it needs and keeps no reference to the account.
///
/// [`Account::create_outbound_session`]: crate::Account::create_outbound_session
/// [`Account::create_inbound_session`]: crate::Account::create_inbound_session
pub struct Session {
    pub(crate) session_keys: SessionKeys,
    pub(crate) role: Role,
    pub(crate) received_message: bool,
    pub(crate) ratchet: DoubleRatchet,
}

impl Session {
    pub(crate) fn new_outbound(
        session_keys: SessionKeys,
        shared_secret: &X3DHSharedSecret,
        config: SessionConfig,
    ) -> Result<Self, Error> {
        let ratchet = DoubleRatchet::new_for_initiator(shared_secret, config)?;

        Ok(Self {
            session_keys,
            role: Role::Initiator,
            received_message: false,
            ratchet,
        })
    }

    pub(crate) fn new_inbound(
        session_keys: SessionKeys,
        shared_secret: &X3DHSharedSecret,
        their_ratchet_key: X25519PublicKey,
        config: SessionConfig,
    ) -> Self {
        Self {
            session_keys,
            role: Role::Responder,
            received_message: true,
            ratchet: DoubleRatchet::new_for_responder(shared_secret, their_ratchet_key, config),
        }
    }

    /// Identifier shared by both ends of the conversation.
    pub fn session_id(&self) -> String {
        self.session_keys.session_id()
    }

    pub fn session_keys(&self) -> SessionKeys {
        self.session_keys
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether a message from the other side has been decrypted, after
    /// which outgoing messages stop carrying handshake material.
    pub fn has_received_message(&self) -> bool {
        self.received_message
    }

    /// Encrypts `plaintext`, producing a pre-key message until the peer has
    /// been heard from and a normal message afterwards.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<OlmMessage, Error> {
        let message = self.ratchet.encrypt(plaintext)?;

        if self.received_message {
            Ok(OlmMessage::Normal(message))
        } else {
            Ok(OlmMessage::PreKey(PreKeyMessage {
                one_time_key: self.session_keys.one_time_key,
                base_key: self.session_keys.base_key,
                identity_key: self.session_keys.identity_key,
                message,
            }))
        }
    }

    /// Decrypts a message from the other end.
    ///
    /// On failure the session is left exactly as it was.
    pub fn decrypt(&mut self, message: &OlmMessage) -> Result<Vec<u8>, Error> {
        let inner = match message {
            OlmMessage::Normal(message) => message,
            OlmMessage::PreKey(message) => {
                if !self.session_keys.matches(message) {
                    warn!(
                        session_id = %self.session_id(),
                        "pre-key message belongs to another session"
                    );
                    return Err(Error::SessionInit(
                        "pre-key message does not match this session".to_string(),
                    ));
                }
                &message.message
            }
        };

        let plaintext = self.ratchet.decrypt(inner).inspect_err(|err| {
            warn!(session_id = %self.session_id(), error = %err, "failed to decrypt message");
        })?;

        if !self.received_message {
            debug!(session_id = %self.session_id(), "session established in both directions");
        }
        self.received_message = true;

        Ok(plaintext)
    }

    /// Whether `message` is a pre-key message for this very session.
    pub fn matches_inbound_session(&self, message: &OlmMessage) -> bool {
        match message {
            OlmMessage::PreKey(message) => self.session_keys.matches(message),
            OlmMessage::Normal(_) => false,
        }
    }

    /// Like [`Session::matches_inbound_session`], additionally requiring the
    /// message to come from `their_identity_key`.
    pub fn matches_inbound_session_from(
        &self,
        their_identity_key: &X25519PublicKey,
        message: &OlmMessage,
    ) -> bool {
        match message {
            OlmMessage::PreKey(pre_key) => {
                pre_key.identity_key == *their_identity_key && self.matches_inbound_session(message)
            }
            OlmMessage::Normal(_) => false,
        }
    }
}

impl Zeroize for Session {
    fn zeroize(&mut self) {
        self.ratchet.zeroize();
        self.received_message = false;
    }
}

impl ZeroizeOnDrop for Session {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Account;

    fn session_pair() -> (Session, Session, OlmMessage) {
        let alice = Account::new(None).unwrap();
        let mut bob = Account::new(None).unwrap();
        bob.generate_one_time_keys(1).unwrap();
        let one_time_key =
            X25519PublicKey::from_base64(bob.one_time_keys().values().next().unwrap()).unwrap();

        let mut alice_session = alice
            .create_outbound_session(&bob.curve25519_key(), &one_time_key)
            .unwrap();
        let first = alice_session.encrypt(b"Hi Bob").unwrap();

        let pre_key = PreKeyMessage::from_bytes(&first.body()).unwrap();
        let bob_session = bob.create_inbound_session(&pre_key).unwrap();

        (alice_session, bob_session, first)
    }

    #[test]
    fn test_session_ids_match() {
        let (alice_session, bob_session, _) = session_pair();

        assert_eq!(alice_session.session_id(), bob_session.session_id());
        assert_eq!(alice_session.role(), Role::Initiator);
        assert_eq!(bob_session.role(), Role::Responder);
    }

    #[test]
    fn test_pre_key_messages_until_reply() {
        let (mut alice_session, mut bob_session, first) = session_pair();

        let second = alice_session.encrypt(b"Still there?").unwrap();
        assert_eq!(second.message_type(), MessageType::PreKey);

        assert_eq!(bob_session.decrypt(&first).unwrap(), b"Hi Bob");
        assert_eq!(bob_session.decrypt(&second).unwrap(), b"Still there?");

        let reply = bob_session.encrypt(b"Hi Alice").unwrap();
        assert_eq!(reply.message_type(), MessageType::Normal);
        assert_eq!(alice_session.decrypt(&reply).unwrap(), b"Hi Alice");
        assert!(alice_session.has_received_message());

        let normal = alice_session.encrypt(b"Great").unwrap();
        assert_eq!(normal.message_type(), MessageType::Normal);
    }

    #[test]
    fn test_matches_inbound_session() {
        let (alice_session, bob_session, first) = session_pair();
        let (_, other_session, other_first) = session_pair();

        assert!(bob_session.matches_inbound_session(&first));
        assert!(!bob_session.matches_inbound_session(&other_first));
        assert!(!other_session.matches_inbound_session(&first));

        let alice_identity = alice_session.session_keys().identity_key;
        assert!(bob_session.matches_inbound_session_from(&alice_identity, &first));
        assert!(!bob_session.matches_inbound_session_from(
            &alice_session.session_keys().base_key,
            &first
        ));
    }

    #[test]
    fn test_pre_key_message_for_other_session_is_rejected() {
        let (_, mut bob_session, _) = session_pair();
        let (_, _, other_first) = session_pair();

        assert!(matches!(
            bob_session.decrypt(&other_first),
            Err(Error::SessionInit(_))
        ));
    }
}
