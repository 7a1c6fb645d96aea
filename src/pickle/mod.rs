//! Passphrase-encrypted persistence of accounts and sessions.
//!
//! A pickle is `base64(version || AES-256-GCM-SIV(protobuf state))`. The AEAD
//! key and nonce are both expanded from the caller's pickle key, so pickling
//! the same state under the same key yields the same blob.

mod account;
mod megolm;
mod session;

use crate::Error;
use crate::crypto;
use crate::encoding;
use prost::Message;
use std::fmt::Display;
use zeroize::Zeroizing;

const PICKLE_VERSION: u8 = 1;
const PICKLE_INFO: &[u8] = b"Olmkit-Pickle";

pub(crate) fn seal<M: Message>(pickle_key: &[u8], state: &M) -> Result<String, Error> {
    let plaintext = Zeroizing::new(state.encode_to_vec());
    let ciphertext = crypto::encrypt(pickle_key, PICKLE_INFO, &plaintext, &[PICKLE_VERSION])?;

    let mut bytes = Vec::with_capacity(1 + ciphertext.len());
    bytes.push(PICKLE_VERSION);
    bytes.extend_from_slice(&ciphertext);
    Ok(encoding::encode(bytes))
}

pub(crate) fn open<M: Message + Default>(pickle: &str, pickle_key: &[u8]) -> Result<M, Error> {
    let bytes = encoding::decode(pickle).map_err(invalid)?;
    let (version, ciphertext) = bytes
        .split_first()
        .ok_or_else(|| Error::Deserialization("pickle is empty".to_string()))?;
    if *version != PICKLE_VERSION {
        return Err(Error::Deserialization(format!(
            "unsupported pickle version {version}"
        )));
    }

    let plaintext = Zeroizing::new(
        crypto::decrypt(pickle_key, PICKLE_INFO, ciphertext, &[PICKLE_VERSION]).map_err(|_| {
            Error::Deserialization("wrong pickle key or corrupted pickle".to_string())
        })?,
    );

    M::decode(plaintext.as_slice()).map_err(invalid)
}

fn invalid(err: impl Display) -> Error {
    Error::Deserialization(err.to_string())
}

fn key_bytes(bytes: &[u8], field: &str) -> Result<Box<[u8; 32]>, Error> {
    let array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| Error::Deserialization(format!("{field} has the wrong length")))?;
    Ok(Box::new(array))
}

fn to_usize(value: u64, field: &str) -> Result<usize, Error> {
    usize::try_from(value).map_err(|_| Error::Deserialization(format!("{field} is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::GroupMessageProto;

    fn sample() -> GroupMessageProto {
        GroupMessageProto {
            message_index: 9,
            ciphertext: vec![4, 5, 6],
        }
    }

    #[test]
    fn test_seal_is_deterministic() {
        let key = b"It's a secret to everybody";

        let first = seal(key, &sample()).unwrap();
        assert_eq!(first, seal(key, &sample()).unwrap());
        assert_eq!(open::<GroupMessageProto>(&first, key).unwrap(), sample());
    }

    #[test]
    fn test_open_rejects_wrong_key_and_corruption() {
        let pickle = seal(b"right key", &sample()).unwrap();

        assert!(matches!(
            open::<GroupMessageProto>(&pickle, b"wrong key"),
            Err(Error::Deserialization(_))
        ));
        assert!(matches!(
            open::<GroupMessageProto>(&pickle[..pickle.len() - 4], b"right key"),
            Err(Error::Deserialization(_))
        ));
        assert!(matches!(
            open::<GroupMessageProto>("", b"right key"),
            Err(Error::Deserialization(_))
        ));
        assert!(matches!(
            open::<GroupMessageProto>("%%%", b"right key"),
            Err(Error::Deserialization(_))
        ));
    }
}
