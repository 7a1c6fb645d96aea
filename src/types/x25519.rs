use crate::Error;
use crate::crypto::random_bytes;
use crate::encoding;
use crate::error::DecodeError;
use x25519_dalek::{PublicKey, SharedSecret, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A Curve25519 public key used for identity, one-time, base and ratchet keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct X25519PublicKey(PublicKey);

impl X25519PublicKey {
    /// Returns the raw 32 bytes of the key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Returns a copy of the raw 32 bytes of the key.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Encodes the key as unpadded base64.
    pub fn to_base64(&self) -> String {
        encoding::encode(self.as_bytes())
    }

    /// Parses an unpadded base64 encoded key.
    pub fn from_base64(input: &str) -> Result<Self, DecodeError> {
        encoding::decode_array::<32>(input, "curve25519 key").map(Self::from)
    }

    pub(crate) fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| DecodeError::InvalidField("curve25519 key"))?;
        Ok(Self::from(bytes))
    }
}

impl From<[u8; 32]> for X25519PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(PublicKey::from(bytes))
    }
}

impl AsRef<PublicKey> for X25519PublicKey {
    fn as_ref(&self) -> &PublicKey {
        &self.0
    }
}

/// A Curve25519 secret key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub(crate) struct X25519Secret(Box<StaticSecret>);

impl X25519Secret {
    /// Generates a fresh secret from the OS RNG.
    pub(crate) fn new() -> Result<Self, Error> {
        let seed = random_bytes::<32>()?;
        Ok(Self::from(*seed))
    }

    pub(crate) fn dh(&self, public_key: &X25519PublicKey) -> SharedSecret {
        self.0.diffie_hellman(public_key.as_ref())
    }

    pub(crate) fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey(PublicKey::from(&*self.0))
    }

    pub(crate) fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub(crate) fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut secret: [u8; 32] = bytes
            .try_into()
            .map_err(|_| DecodeError::InvalidField("curve25519 secret"))?;
        let key = Self::from(secret);
        secret.zeroize();
        Ok(key)
    }
}

impl From<[u8; 32]> for X25519Secret {
    fn from(bytes: [u8; 32]) -> Self {
        Self(Box::new(StaticSecret::from(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dh_agreement() {
        let alice = X25519Secret::new().unwrap();
        let bob = X25519Secret::new().unwrap();

        assert_eq!(
            alice.dh(&bob.public_key()).as_bytes(),
            bob.dh(&alice.public_key()).as_bytes()
        );
    }

    #[test]
    fn test_public_key_base64_roundtrip() {
        let secret = X25519Secret::new().unwrap();
        let public_key = secret.public_key();

        let encoded = public_key.to_base64();
        assert_eq!(encoded.len(), 43);
        assert_eq!(X25519PublicKey::from_base64(&encoded).unwrap(), public_key);
    }

    #[test]
    fn test_secret_restores_same_public_key() {
        let secret = X25519Secret::new().unwrap();
        let restored = X25519Secret::from_slice(&secret.to_bytes()).unwrap();

        assert_eq!(secret.public_key(), restored.public_key());
        assert!(X25519Secret::from_slice(&[0u8; 16]).is_err());
    }
}
