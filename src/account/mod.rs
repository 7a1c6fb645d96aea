mod one_time_keys;

pub use one_time_keys::KeyId;
pub(crate) use one_time_keys::{OneTimeKey, OneTimeKeyStore};

use crate::config::AccountConfig;
use crate::session::{PreKeyMessage, Role, Session, SessionKeys};
use crate::types::{Ed25519Keypair, Ed25519PublicKey, X25519PublicKey, X25519Secret};
use crate::{Error, x3dh};
use std::collections::BTreeMap;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The public halves of an account's long-term keys, base64 encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityKeys {
    /// Curve25519 identity key used in the session handshake.
    pub curve25519: String,
    /// Ed25519 fingerprint key used for signatures.
    pub ed25519: String,
}

/// Long-term identity of one device.
///
/// Holds the Curve25519 identity key, the Ed25519 fingerprint key and a pool
/// of one-time keys that peers claim to open sessions with this account.
pub struct Account {
    pub(crate) identity_key: X25519Secret,
    pub(crate) signing_key: Ed25519Keypair,
    pub(crate) one_time_keys: OneTimeKeyStore,
    pub(crate) config: AccountConfig,
}

impl Account {
    /// Creates a new account with the given configuration.
    ///
    /// If no configuration is provided, default values are used.
    pub fn new(config: Option<AccountConfig>) -> Result<Self, Error> {
        let config = config.unwrap_or_default();

        let identity_key =
            X25519Secret::new().map_err(|err| Error::Initialization(err.to_string()))?;
        let signing_key =
            Ed25519Keypair::new().map_err(|err| Error::Initialization(err.to_string()))?;

        let account = Self {
            identity_key,
            signing_key,
            one_time_keys: OneTimeKeyStore::new(config.max_one_time_keys),
            config,
        };
        debug!(identity_key = %account.curve25519_key().to_base64(), "created account");

        Ok(account)
    }

    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    pub fn curve25519_key(&self) -> X25519PublicKey {
        self.identity_key.public_key()
    }

    pub fn ed25519_key(&self) -> Ed25519PublicKey {
        self.signing_key.public_key()
    }

    pub fn identity_keys(&self) -> IdentityKeys {
        IdentityKeys {
            curve25519: self.curve25519_key().to_base64(),
            ed25519: self.ed25519_key().to_base64(),
        }
    }

    /// Unpublished one-time keys, keyed by their base64 key id.
    pub fn one_time_keys(&self) -> BTreeMap<String, String> {
        self.one_time_keys
            .unpublished()
            .map(|(key_id, public_key)| (key_id.to_base64(), public_key.to_base64()))
            .collect()
    }

    /// Generates `count` new one-time keys. Once more than
    /// [`Account::max_one_time_keys`] are stored the oldest are discarded.
    pub fn generate_one_time_keys(&mut self, count: usize) -> Result<(), Error> {
        self.one_time_keys.generate(count)
    }

    /// Marks every stored one-time key as published. Published keys remain
    /// usable for inbound sessions until they are removed.
    pub fn mark_keys_as_published(&mut self) {
        self.one_time_keys.mark_as_published();
    }

    pub fn max_one_time_keys(&self) -> usize {
        self.config.max_one_time_keys
    }

    /// Removes the one-time key that `session` was established with.
    ///
    /// Outbound sessions consumed none of our keys and leave the store
    /// untouched. For an inbound session the key must still be held by this
    /// account, otherwise [`Error::KeyNotFound`] is returned.
    pub fn remove_one_time_keys(&mut self, session: &Session) -> Result<(), Error> {
        if session.role() == Role::Initiator {
            return Ok(());
        }

        let one_time_key = session.session_keys().one_time_key;
        match self.one_time_keys.remove(&one_time_key) {
            Some(key_id) => {
                debug!(key_id = %key_id.to_base64(), "removed used one-time key");
                Ok(())
            }
            None => Err(Error::KeyNotFound(one_time_key.to_base64())),
        }
    }

    /// Signs `message` with the Ed25519 fingerprint key, returning the base64
    /// signature.
    pub fn sign(&self, message: &[u8]) -> String {
        self.signing_key.sign(message).to_base64()
    }

    /// Opens a session to the owner of `their_identity_key` using one of their
    /// published one-time keys.
    pub fn create_outbound_session(
        &self,
        their_identity_key: &X25519PublicKey,
        their_one_time_key: &X25519PublicKey,
    ) -> Result<Session, Error> {
        let base_key = X25519Secret::new().map_err(|err| Error::SessionInit(err.to_string()))?;

        let shared_secret = x3dh::initiate(
            &self.identity_key,
            &base_key,
            their_identity_key,
            their_one_time_key,
        )?;

        let session_keys = SessionKeys {
            identity_key: self.curve25519_key(),
            base_key: base_key.public_key(),
            one_time_key: *their_one_time_key,
        };
        let session =
            Session::new_outbound(session_keys, &shared_secret, self.config.session.clone())
                .map_err(|err| Error::SessionInit(err.to_string()))?;

        debug!(session_id = %session.session_id(), "created outbound session");
        Ok(session)
    }

    /// Creates the responder's session from the first pre-key message of a
    /// conversation.
    ///
    /// The one-time key is not removed; call [`Account::remove_one_time_keys`]
    /// once the first message has been decrypted.
    pub fn create_inbound_session(&self, message: &PreKeyMessage) -> Result<Session, Error> {
        let (key_id, one_time_key) = self
            .one_time_keys
            .find(&message.one_time_key)
            .ok_or_else(|| {
                Error::SessionInit("message refers to an unknown one-time key".to_string())
            })?;

        let shared_secret = x3dh::respond(
            &self.identity_key,
            one_time_key,
            &message.identity_key,
            &message.base_key,
        )?;

        let session_keys = SessionKeys {
            identity_key: message.identity_key,
            base_key: message.base_key,
            one_time_key: message.one_time_key,
        };
        let session = Session::new_inbound(
            session_keys,
            &shared_secret,
            message.message.ratchet_key,
            self.config.session.clone(),
        );

        debug!(
            session_id = %session.session_id(),
            key_id = %key_id.to_base64(),
            "created inbound session"
        );
        Ok(session)
    }

    /// Like [`Account::create_inbound_session`], but fails unless the message
    /// was sent by `their_identity_key`.
    pub fn create_inbound_session_from(
        &self,
        their_identity_key: &X25519PublicKey,
        message: &PreKeyMessage,
    ) -> Result<Session, Error> {
        if message.identity_key != *their_identity_key {
            return Err(Error::SessionInit(
                "message was sent from a different identity key".to_string(),
            ));
        }

        self.create_inbound_session(message)
    }
}

impl Zeroize for Account {
    fn zeroize(&mut self) {
        self.identity_key.zeroize();
        self.signing_key.zeroize();
        self.one_time_keys.zeroize();
    }
}

impl ZeroizeOnDrop for Account {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::session::OlmMessage;
    use crate::utility;

    fn first_one_time_key(account: &Account) -> X25519PublicKey {
        X25519PublicKey::from_base64(account.one_time_keys().values().next().unwrap()).unwrap()
    }

    fn pre_key_message(message: OlmMessage) -> PreKeyMessage {
        PreKeyMessage::from_bytes(&message.body()).unwrap()
    }

    #[test]
    fn test_identity_keys_are_stable() {
        let account = Account::new(None).unwrap();

        let keys = account.identity_keys();
        assert_eq!(keys, account.identity_keys());
        assert_eq!(keys.curve25519.len(), 43);
        assert_eq!(keys.ed25519.len(), 43);
        assert_eq!(account.max_one_time_keys(), 100);
    }

    #[test]
    fn test_one_time_key_capacity() {
        let config = AccountConfig {
            max_one_time_keys: 5,
            session: SessionConfig::default(),
        };
        let mut account = Account::new(Some(config)).unwrap();

        account.generate_one_time_keys(3).unwrap();
        let first_batch = account.one_time_keys();
        account.generate_one_time_keys(4).unwrap();

        let keys = account.one_time_keys();
        assert_eq!(keys.len(), 5);
        // The two oldest keys were evicted.
        let survivors = first_batch.keys().filter(|key_id| keys.contains_key(*key_id));
        assert_eq!(survivors.count(), 1);
    }

    #[test]
    fn test_mark_keys_as_published() {
        let mut account = Account::new(None).unwrap();
        account.generate_one_time_keys(5).unwrap();

        account.mark_keys_as_published();
        assert!(account.one_time_keys().is_empty());

        account.generate_one_time_keys(1).unwrap();
        assert_eq!(account.one_time_keys().len(), 1);
    }

    #[test]
    fn test_sign_verifies_with_identity_key() {
        let account = Account::new(None).unwrap();
        let signature = account.sign(b"device keys");

        assert_eq!(signature, account.sign(b"device keys"));
        assert!(
            utility::verify_signature(&account.identity_keys().ed25519, b"device keys", &signature)
                .is_ok()
        );
    }

    #[test]
    fn test_remove_one_time_keys() {
        let alice = Account::new(None).unwrap();
        let mut bob = Account::new(None).unwrap();
        bob.generate_one_time_keys(5).unwrap();
        let one_time_key = first_one_time_key(&bob);

        let mut alice_session = alice
            .create_outbound_session(&bob.curve25519_key(), &one_time_key)
            .unwrap();
        let message = pre_key_message(alice_session.encrypt(b"Hello").unwrap());
        let mut bob_session = bob.create_inbound_session(&message).unwrap();
        assert_eq!(
            bob_session
                .decrypt(&OlmMessage::PreKey(message.clone()))
                .unwrap(),
            b"Hello"
        );

        bob.remove_one_time_keys(&bob_session).unwrap();
        let remaining = bob.one_time_keys();
        assert_eq!(remaining.len(), 4);
        assert!(!remaining.values().any(|key| *key == one_time_key.to_base64()));

        // The key is gone, so neither a second removal nor a second inbound
        // session from the same message succeeds.
        assert!(matches!(
            bob.remove_one_time_keys(&bob_session),
            Err(Error::KeyNotFound(_))
        ));
        assert!(matches!(
            bob.create_inbound_session(&message),
            Err(Error::SessionInit(_))
        ));
    }

    #[test]
    fn test_remove_one_time_keys_for_outbound_session_is_noop() {
        let mut alice = Account::new(None).unwrap();
        let mut bob = Account::new(None).unwrap();
        alice.generate_one_time_keys(2).unwrap();
        bob.generate_one_time_keys(1).unwrap();

        let alice_session = alice
            .create_outbound_session(&bob.curve25519_key(), &first_one_time_key(&bob))
            .unwrap();

        assert!(alice.remove_one_time_keys(&alice_session).is_ok());
        assert_eq!(alice.one_time_keys().len(), 2);
    }

    #[test]
    fn test_create_inbound_session_from() {
        let alice = Account::new(None).unwrap();
        let eve = Account::new(None).unwrap();
        let mut bob = Account::new(None).unwrap();
        bob.generate_one_time_keys(1).unwrap();

        let mut alice_session = alice
            .create_outbound_session(&bob.curve25519_key(), &first_one_time_key(&bob))
            .unwrap();
        let message = pre_key_message(alice_session.encrypt(b"Hello").unwrap());

        assert!(matches!(
            bob.create_inbound_session_from(&eve.curve25519_key(), &message),
            Err(Error::SessionInit(_))
        ));
        let session = bob
            .create_inbound_session_from(&alice.curve25519_key(), &message)
            .unwrap();
        assert_eq!(session.session_id(), alice_session.session_id());
    }
}
