use crate::Error;
use crate::crypto::hmac_sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

const CHAIN_KEY_SEED: &[u8] = &[0x01];
const MESSAGE_KEY_SEED: &[u8] = &[0x02];

/// Symmetric ratchet chain for deriving message keys
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct Chain {
    chain_key: Box<[u8; 32]>,
    index: u32,
}

impl Chain {
    pub(crate) fn new(chain_key: Box<[u8; 32]>) -> Self {
        Self::from_parts(chain_key, 0)
    }

    pub(crate) fn from_parts(chain_key: Box<[u8; 32]>, index: u32) -> Self {
        Self { chain_key, index }
    }

    /// Index of the message key the next call to [`Chain::next`] returns.
    pub(crate) fn index(&self) -> u32 {
        self.index
    }

    pub(crate) fn chain_key(&self) -> &[u8; 32] {
        &self.chain_key
    }

    /// Advances the chain and returns the message key for the current index
    pub(crate) fn next(&mut self) -> Result<Zeroizing<[u8; 32]>, Error> {
        let message_key = Zeroizing::new(hmac_sha256(&self.chain_key, MESSAGE_KEY_SEED)?);
        let mut next_chain_key = hmac_sha256(&self.chain_key, CHAIN_KEY_SEED)?;

        self.chain_key.copy_from_slice(&next_chain_key);
        next_chain_key.zeroize();
        self.index = self.index.wrapping_add(1);

        Ok(message_key)
    }
}
