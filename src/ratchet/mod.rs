mod chain;

pub(crate) use chain::Chain;

use crate::Error;
use crate::config::SessionConfig;
use crate::crypto::{self, hkdf_expand};
use crate::error::DecodeError;
use crate::session::Message;
use crate::types::{X25519PublicKey, X25519Secret};
use crate::x3dh::X3DHSharedSecret;
use tracing::{debug, trace};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

const RATCHET_INFO: &[u8] = b"Olmkit-Ratchet";
const MESSAGE_KEY_INFO: &[u8] = b"Olmkit-Message-Keys";

/// Our current ratchet key pair and the chain that encrypts under it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct SenderChain {
    pub(crate) ratchet_key: X25519Secret,
    pub(crate) chain: Chain,
}

/// A chain for decrypting messages sent under one of the peer's ratchet keys.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct ReceiverChain {
    #[zeroize(skip)]
    pub(crate) ratchet_key: X25519PublicKey,
    pub(crate) chain: Chain,
}

/// A message key derived for a message that has not arrived yet.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct SkippedMessageKey {
    #[zeroize(skip)]
    pub(crate) ratchet_key: X25519PublicKey,
    pub(crate) index: u32,
    pub(crate) message_key: Box<[u8; 32]>,
}

/// Keys produced by one Diffie-Hellman turn of the ratchet.
struct RatchetStep {
    root_key: Box<[u8; 32]>,
    chain_key: Box<[u8; 32]>,
}

/// Double ratchet of a pairwise session.
///
/// The Diffie-Hellman half of the ratchet is lazy: a new sending ratchet key
/// is only generated on the first encryption after the peer has moved to a
/// new ratchet key of their own. Until then the sender chain is empty.
///
/// Receiver chains are ordered oldest first and bounded by
/// [`SessionConfig::max_receiver_chains`]; keys for skipped messages are kept
/// in a FIFO bounded by [`SessionConfig::max_skipped_message_keys`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct DoubleRatchet {
    pub(crate) root_key: Box<[u8; 32]>,
    pub(crate) sender_chain: Option<SenderChain>,
    pub(crate) receiver_chains: Vec<ReceiverChain>,
    pub(crate) skipped_message_keys: Vec<SkippedMessageKey>,
    #[zeroize(skip)]
    pub(crate) config: SessionConfig,
}

impl DoubleRatchet {
    /// Ratchet of the session initiator, which can send right away.
    pub(crate) fn new_for_initiator(
        shared_secret: &X3DHSharedSecret,
        config: SessionConfig,
    ) -> Result<Self, Error> {
        let ratchet_key = X25519Secret::new()?;

        Ok(Self {
            root_key: Box::new(*shared_secret.root_key),
            sender_chain: Some(SenderChain {
                ratchet_key,
                chain: Chain::new(Box::new(*shared_secret.chain_key)),
            }),
            receiver_chains: Vec::new(),
            skipped_message_keys: Vec::new(),
            config,
        })
    }

    /// Ratchet of the responder, which starts by receiving on the
    /// initiator's first ratchet key.
    pub(crate) fn new_for_responder(
        shared_secret: &X3DHSharedSecret,
        their_ratchet_key: X25519PublicKey,
        config: SessionConfig,
    ) -> Self {
        Self {
            root_key: Box::new(*shared_secret.root_key),
            sender_chain: None,
            receiver_chains: vec![ReceiverChain {
                ratchet_key: their_ratchet_key,
                chain: Chain::new(Box::new(*shared_secret.chain_key)),
            }],
            skipped_message_keys: Vec::new(),
            config,
        }
    }

    pub(crate) fn encrypt(&mut self, plaintext: &[u8]) -> Result<Message, Error> {
        let mut sender_chain = match self.sender_chain.take() {
            Some(sender_chain) => sender_chain,
            None => self.create_sender_chain()?,
        };

        let ratchet_key = sender_chain.ratchet_key.public_key();
        let chain_index = sender_chain.chain.index();
        let message_key = sender_chain.chain.next();
        self.sender_chain = Some(sender_chain);
        let message_key = message_key?;

        let ciphertext = crypto::encrypt(
            message_key.as_slice(),
            MESSAGE_KEY_INFO,
            plaintext,
            &Message::associated_data(&ratchet_key, chain_index),
        )?;

        Ok(Message {
            ratchet_key,
            chain_index,
            ciphertext,
        })
    }

    /// Decrypts a message, committing ratchet changes only if it authenticates.
    pub(crate) fn decrypt(&mut self, message: &Message) -> Result<Vec<u8>, Error> {
        let mut ratchet = self.clone();
        let plaintext = ratchet.decrypt_in_place(message)?;
        *self = ratchet;

        Ok(plaintext)
    }

    fn decrypt_in_place(&mut self, message: &Message) -> Result<Vec<u8>, Error> {
        match self
            .receiver_chains
            .iter()
            .position(|chain| chain.ratchet_key == message.ratchet_key)
        {
            Some(position) => self.decrypt_with_chain(position, message),
            None => self.decrypt_with_new_chain(message),
        }
    }

    fn decrypt_with_chain(&mut self, position: usize, message: &Message) -> Result<Vec<u8>, Error> {
        let config = self.config.clone();
        let chain = self
            .receiver_chains
            .get_mut(position)
            .ok_or_else(|| Error::Authentication("receiver chain is gone".to_string()))?;

        if message.chain_index < chain.chain.index() {
            return self.decrypt_with_skipped_key(message);
        }

        let (skipped, message_key) = advance_chain(chain, message.chain_index, &config)?;
        let plaintext = decrypt_message(&message_key, message)?;
        self.store_skipped_keys(skipped);

        Ok(plaintext)
    }

    fn decrypt_with_skipped_key(&mut self, message: &Message) -> Result<Vec<u8>, Error> {
        let position = self
            .skipped_message_keys
            .iter()
            .position(|key| {
                key.ratchet_key == message.ratchet_key && key.index == message.chain_index
            })
            .ok_or(DecodeError::MissingMessageKey(message.chain_index))?;

        let skipped = self.skipped_message_keys.remove(position);
        decrypt_message(&skipped.message_key, message)
    }

    fn decrypt_with_new_chain(&mut self, message: &Message) -> Result<Vec<u8>, Error> {
        let sender_chain = self.sender_chain.as_ref().ok_or_else(|| {
            Error::Authentication("message uses an unknown ratchet key".to_string())
        })?;

        let step = self.derive_ratchet_step(&sender_chain.ratchet_key, &message.ratchet_key)?;
        let mut chain = ReceiverChain {
            ratchet_key: message.ratchet_key,
            chain: Chain::new(step.chain_key),
        };

        let (skipped, message_key) = advance_chain(&mut chain, message.chain_index, &self.config)?;
        let plaintext = decrypt_message(&message_key, message)?;

        trace!(chain_index = message.chain_index, "peer advanced its ratchet key");

        self.root_key = step.root_key;
        self.sender_chain = None;
        self.receiver_chains.push(chain);
        if self.receiver_chains.len() > self.config.max_receiver_chains {
            self.receiver_chains.remove(0);
            debug!("dropped the oldest receiver chain");
        }
        self.store_skipped_keys(skipped);

        Ok(plaintext)
    }

    /// Starts a new sending chain on a fresh ratchet key, against the newest
    /// ratchet key the peer has used.
    fn create_sender_chain(&mut self) -> Result<SenderChain, Error> {
        let their_ratchet_key = self
            .receiver_chains
            .last()
            .map(|chain| chain.ratchet_key)
            .ok_or_else(|| Error::SessionInit("session has no chain to ratchet from".to_string()))?;

        let ratchet_key = X25519Secret::new()?;
        let step = self.derive_ratchet_step(&ratchet_key, &their_ratchet_key)?;
        self.root_key = step.root_key;

        trace!("started a new sending chain");

        Ok(SenderChain {
            ratchet_key,
            chain: Chain::new(step.chain_key),
        })
    }

    fn derive_ratchet_step(
        &self,
        our_ratchet_key: &X25519Secret,
        their_ratchet_key: &X25519PublicKey,
    ) -> Result<RatchetStep, Error> {
        let shared_secret = our_ratchet_key.dh(their_ratchet_key);
        let derived = hkdf_expand::<64>(
            Some(self.root_key.as_slice()),
            shared_secret.as_bytes(),
            RATCHET_INFO,
        )?;

        let mut root_key = Box::new([0u8; 32]);
        let mut chain_key = Box::new([0u8; 32]);
        root_key.copy_from_slice(&derived[..32]);
        chain_key.copy_from_slice(&derived[32..]);

        Ok(RatchetStep {
            root_key,
            chain_key,
        })
    }

    fn store_skipped_keys(&mut self, skipped: Vec<SkippedMessageKey>) {
        self.skipped_message_keys.extend(skipped);

        let excess = self
            .skipped_message_keys
            .len()
            .saturating_sub(self.config.max_skipped_message_keys);
        if excess > 0 {
            self.skipped_message_keys.drain(..excess);
            debug!(evicted = excess, "evicted skipped message keys");
        }
    }
}

/// Moves `chain` up to `index`, returning the keys of the messages jumped
/// over and the message key for `index` itself.
fn advance_chain(
    chain: &mut ReceiverChain,
    index: u32,
    config: &SessionConfig,
) -> Result<(Vec<SkippedMessageKey>, Zeroizing<[u8; 32]>), Error> {
    let current = chain.chain.index();
    if index - current > config.max_message_gap {
        return Err(DecodeError::TooFarAhead { current, index }.into());
    }

    let mut skipped = Vec::new();
    while chain.chain.index() < index {
        let skipped_index = chain.chain.index();
        let message_key = chain.chain.next()?;
        skipped.push(SkippedMessageKey {
            ratchet_key: chain.ratchet_key,
            index: skipped_index,
            message_key: Box::new(*message_key),
        });
    }

    Ok((skipped, chain.chain.next()?))
}

fn decrypt_message(message_key: &[u8; 32], message: &Message) -> Result<Vec<u8>, Error> {
    crypto::decrypt(
        message_key,
        MESSAGE_KEY_INFO,
        &message.ciphertext,
        &Message::associated_data(&message.ratchet_key, message.chain_index),
    )
}
