use crate::Error;
use aes_gcm_siv::aead::{Aead, Payload};
use aes_gcm_siv::{Aes256GcmSiv, Key, KeyInit, Nonce};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12; // AES-GCM-SIV uses 12-byte (96-bit) nonces

type HmacSha256 = Hmac<Sha256>;

/// Fills a buffer of `N` bytes from the operating system RNG.
pub(crate) fn random_bytes<const N: usize>() -> Result<Zeroizing<[u8; N]>, Error> {
    let mut bytes = Zeroizing::new([0u8; N]);
    OsRng
        .try_fill_bytes(bytes.as_mut_slice())
        .map_err(|_| Error::Random)?;
    Ok(bytes)
}

/// HMAC-SHA256 keyed with a 32-byte key.
pub(crate) fn hmac_sha256(key: &[u8; 32], input: &[u8]) -> Result<[u8; 32], Error> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|err| Error::KeyGeneration(format!("HMAC initialization failed: {err}")))?;
    mac.update(input);
    Ok(mac.finalize().into_bytes().into())
}

pub(crate) fn sha256(input: &[u8]) -> [u8; 32] {
    Sha256::digest(input).into()
}

/// HKDF-SHA256 extract-and-expand into `N` bytes.
pub(crate) fn hkdf_expand<const N: usize>(
    salt: Option<&[u8]>,
    input_key_material: &[u8],
    info: &[u8],
) -> Result<Zeroizing<[u8; N]>, Error> {
    let hkdf = Hkdf::<Sha256>::new(salt, input_key_material);

    let mut output = Zeroizing::new([0u8; N]);
    hkdf.expand(info, output.as_mut_slice())
        .map_err(|_| Error::KeyGeneration("HKDF expansion failed".to_string()))?;

    Ok(output)
}

fn cipher_for(
    key_material: &[u8],
    info: &[u8],
) -> Result<(Aes256GcmSiv, [u8; NONCE_SIZE]), Error> {
    let derived = hkdf_expand::<{ KEY_SIZE + NONCE_SIZE }>(None, key_material, info)?;

    let key = Key::<Aes256GcmSiv>::from_slice(&derived[..KEY_SIZE]);
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&derived[KEY_SIZE..]);

    Ok((Aes256GcmSiv::new(key), nonce))
}

/// Encrypts under a key and nonce expanded from `key_material` with `info`.
///
/// Every message key is used for exactly one message, so the derived nonce
/// never repeats under the same key.
pub(crate) fn encrypt(
    key_material: &[u8],
    info: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, Error> {
    let (cipher, nonce) = cipher_for(key_material, info)?;

    Ok(cipher.encrypt(
        Nonce::from_slice(&nonce),
        Payload {
            msg: plaintext,
            aad,
        },
    )?)
}

pub(crate) fn decrypt(
    key_material: &[u8],
    info: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, Error> {
    let (cipher, nonce) = cipher_for(key_material, info)?;

    cipher
        .decrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| Error::Authentication("message authentication failed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_known_answer() {
        // RFC 4231 test case 2, with the key zero-padded to 32 bytes.
        let mut key = [0u8; 32];
        key[..4].copy_from_slice(b"Jefe");
        let expected = [
            0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e, 0x6a, 0x04, 0x24, 0x26, 0x08, 0x95,
            0x75, 0xc7, 0x5a, 0x00, 0x3f, 0x08, 0x9d, 0x27, 0x39, 0x83, 0x9d, 0xec, 0x58, 0xb9,
            0x64, 0xec, 0x38, 0x43,
        ];

        assert_eq!(
            hmac_sha256(&key, b"what do ya want for nothing?").unwrap(),
            expected
        );
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = [1u8; 32];
        let ciphertext = encrypt(&key, b"info", b"Hello", b"aad").unwrap();

        assert_eq!(decrypt(&key, b"info", &ciphertext, b"aad").unwrap(), b"Hello");
        assert!(matches!(
            decrypt(&key, b"info", &ciphertext, b"other"),
            Err(Error::Authentication(_))
        ));
        assert!(matches!(
            decrypt(&key, b"other-info", &ciphertext, b"aad"),
            Err(Error::Authentication(_))
        ));
    }

    #[test]
    fn test_random_bytes_differ() {
        let a = random_bytes::<32>().unwrap();
        let b = random_bytes::<32>().unwrap();
        assert_ne!(*a, *b);
    }
}
