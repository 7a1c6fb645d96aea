use crate::Error;
use crate::encoding;
use crate::types::{X25519PublicKey, X25519Secret};
use std::collections::BTreeMap;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Identifier of a one-time key, allocated in increasing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyId(pub(crate) u32);

impl KeyId {
    /// Base64 of the big-endian id, the form keys are published under.
    pub fn to_base64(&self) -> String {
        encoding::encode(self.0.to_be_bytes())
    }
}

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct OneTimeKey {
    pub(crate) secret: X25519Secret,
    pub(crate) published: bool,
}

/// One-time keys of an account, oldest first.
pub(crate) struct OneTimeKeyStore {
    pub(crate) keys: BTreeMap<KeyId, OneTimeKey>,
    pub(crate) next_key_id: u32,
    pub(crate) max_keys: usize,
}

impl OneTimeKeyStore {
    pub(crate) fn new(max_keys: usize) -> Self {
        Self {
            keys: BTreeMap::new(),
            next_key_id: 0,
            max_keys,
        }
    }

    /// Generates `count` keys, evicting the oldest ones once the store holds
    /// more than `max_keys`.
    ///
    /// Only the newest `max_keys` of a batch could survive eviction, so the
    /// ids of the others are allocated without generating their keys. Fails
    /// without touching the store once the id space is exhausted.
    pub(crate) fn generate(&mut self, count: usize) -> Result<(), Error> {
        let exhausted = || Error::KeyGeneration("one-time key ids are exhausted".to_string());

        let fresh_count = count.min(self.max_keys);
        let skipped = u32::try_from(count - fresh_count).map_err(|_| exhausted())?;
        let first_key_id = self.next_key_id.checked_add(skipped).ok_or_else(exhausted)?;
        let next_key_id = u32::try_from(fresh_count)
            .ok()
            .and_then(|fresh| first_key_id.checked_add(fresh))
            .ok_or_else(exhausted)?;

        let mut fresh = Vec::with_capacity(fresh_count);
        for _ in 0..fresh_count {
            let secret =
                X25519Secret::new().map_err(|err| Error::KeyGeneration(err.to_string()))?;
            fresh.push(secret);
        }

        for (key_id, secret) in (first_key_id..next_key_id).zip(fresh) {
            self.keys.insert(
                KeyId(key_id),
                OneTimeKey {
                    secret,
                    published: false,
                },
            );
        }
        self.next_key_id = next_key_id;

        let mut evicted = 0usize;
        while self.keys.len() > self.max_keys {
            self.keys.pop_first();
            evicted += 1;
        }

        debug!(
            generated = fresh_count,
            skipped,
            evicted,
            stored = self.keys.len(),
            "generated one-time keys"
        );
        Ok(())
    }

    pub(crate) fn unpublished(&self) -> impl Iterator<Item = (KeyId, X25519PublicKey)> + '_ {
        self.keys
            .iter()
            .filter(|(_, key)| !key.published)
            .map(|(key_id, key)| (*key_id, key.secret.public_key()))
    }

    pub(crate) fn mark_as_published(&mut self) {
        for key in self.keys.values_mut() {
            key.published = true;
        }
    }

    pub(crate) fn find(&self, public_key: &X25519PublicKey) -> Option<(KeyId, &X25519Secret)> {
        self.keys
            .iter()
            .find(|(_, key)| key.secret.public_key() == *public_key)
            .map(|(key_id, key)| (*key_id, &key.secret))
    }

    pub(crate) fn remove(&mut self, public_key: &X25519PublicKey) -> Option<KeyId> {
        let (key_id, _) = self.find(public_key)?;
        self.keys.remove(&key_id);
        Some(key_id)
    }
}

impl Zeroize for OneTimeKeyStore {
    fn zeroize(&mut self) {
        for key in self.keys.values_mut() {
            key.zeroize();
        }
        self.keys.clear();
    }
}

impl ZeroizeOnDrop for OneTimeKeyStore {}
