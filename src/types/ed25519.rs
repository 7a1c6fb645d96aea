use crate::Error;
use crate::crypto::random_bytes;
use crate::encoding;
use crate::error::DecodeError;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use zeroize::Zeroize;

/// Length in bytes of a detached Ed25519 signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// An Ed25519 public key, used as the account fingerprint key and as the
/// authorship key of a group session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519PublicKey(VerifyingKey);

impl Ed25519PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    pub fn to_base64(&self) -> String {
        encoding::encode(self.as_bytes())
    }

    pub fn from_base64(input: &str) -> Result<Self, DecodeError> {
        let bytes = encoding::decode_array::<32>(input, "ed25519 key")?;
        Self::from_slice(&bytes)
    }

    pub(crate) fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| DecodeError::InvalidField("ed25519 key"))?;
        VerifyingKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|_| DecodeError::InvalidField("ed25519 key"))
    }

    /// Verifies a detached signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), Error> {
        self.0
            .verify_strict(message, &signature.0)
            .map_err(|err| Error::InvalidSignature(err.to_string()))
    }
}

/// A detached Ed25519 signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519Signature(Signature);

impl Ed25519Signature {
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        self.0.to_bytes()
    }

    pub fn to_base64(&self) -> String {
        encoding::encode(self.to_bytes())
    }

    pub fn from_base64(input: &str) -> Result<Self, DecodeError> {
        let bytes = encoding::decode_array::<SIGNATURE_LENGTH>(input, "ed25519 signature")?;
        Ok(Self(Signature::from_bytes(&bytes)))
    }

    pub(crate) fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        let bytes: [u8; SIGNATURE_LENGTH] = bytes
            .try_into()
            .map_err(|_| DecodeError::InvalidField("ed25519 signature"))?;
        Ok(Self(Signature::from_bytes(&bytes)))
    }
}

/// An Ed25519 signing key pair.
#[derive(Clone)]
pub(crate) struct Ed25519Keypair {
    signing_key: Box<SigningKey>,
}

impl Ed25519Keypair {
    pub(crate) fn new() -> Result<Self, Error> {
        let seed = random_bytes::<32>()?;
        Ok(Self::from_seed(&seed))
    }

    pub(crate) fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: Box::new(SigningKey::from_bytes(seed)),
        }
    }

    pub(crate) fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| DecodeError::InvalidField("ed25519 secret"))?;
        let keypair = Self::from_seed(&seed);
        seed.zeroize();
        Ok(keypair)
    }

    pub(crate) fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key())
    }

    pub(crate) fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(message))
    }

    /// The 32-byte seed the key pair was derived from.
    pub(crate) fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Zeroize for Ed25519Keypair {
    fn zeroize(&mut self) {
        // SigningKey zeroizes its own secret scalar on drop.
        *self.signing_key = SigningKey::from_bytes(&[0u8; 32]);
    }
}
