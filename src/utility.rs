//! Stateless helpers that sit next to the session engine.

use crate::Error;
use crate::crypto;
use crate::encoding;
use crate::types::{Ed25519PublicKey, Ed25519Signature};

/// Verifies an Ed25519 signature given the base64 public key and the base64
/// signature, as published by [`Account::identity_keys`](crate::Account::identity_keys)
/// and [`Account::sign`](crate::Account::sign).
pub fn verify_signature(key: &str, message: &[u8], signature: &str) -> Result<(), Error> {
    let key = Ed25519PublicKey::from_base64(key)
        .map_err(|err| Error::InvalidSignature(err.to_string()))?;
    let signature = Ed25519Signature::from_base64(signature)
        .map_err(|err| Error::InvalidSignature(err.to_string()))?;

    key.verify(message, &signature)
}

/// Base64 SHA-256 digest of `input`.
pub fn sha256(input: &[u8]) -> String {
    encoding::encode(crypto::sha256(input))
}
