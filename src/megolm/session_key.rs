use super::ratchet::{MegolmRatchet, RATCHET_LENGTH};
use crate::Error;
use crate::encoding;
use crate::types::{Ed25519Keypair, Ed25519PublicKey, Ed25519Signature, SIGNATURE_LENGTH};
use zeroize::Zeroizing;

const SESSION_KEY_VERSION: u8 = 2;
const EXPORT_VERSION: u8 = 1;

const HEADER_LENGTH: usize = 1 + 4;
const EXPORT_LENGTH: usize = HEADER_LENGTH + RATCHET_LENGTH + 32;
const SESSION_KEY_LENGTH: usize = EXPORT_LENGTH + SIGNATURE_LENGTH;

/// Ratchet state and authorship key recovered from a session key or export.
pub(crate) struct RatchetSnapshot {
    pub(crate) ratchet: MegolmRatchet,
    pub(crate) signing_key: Ed25519PublicKey,
}

fn write_unsigned(
    version: u8,
    ratchet: &MegolmRatchet,
    signing_key: &Ed25519PublicKey,
) -> Zeroizing<Vec<u8>> {
    let mut bytes = Zeroizing::new(Vec::with_capacity(SESSION_KEY_LENGTH));
    bytes.push(version);
    bytes.extend_from_slice(&ratchet.index().to_be_bytes());
    bytes.extend_from_slice(ratchet.to_bytes().as_slice());
    bytes.extend_from_slice(signing_key.as_bytes());
    bytes
}

fn read_unsigned(bytes: &[u8], version: u8) -> Result<RatchetSnapshot, Error> {
    if bytes.len() != EXPORT_LENGTH {
        return Err(Error::SessionCreation(format!(
            "expected {EXPORT_LENGTH} bytes, got {}",
            bytes.len()
        )));
    }
    if bytes[0] != version {
        return Err(Error::SessionCreation(format!(
            "unsupported version {}",
            bytes[0]
        )));
    }

    let mut index = [0u8; 4];
    index.copy_from_slice(&bytes[1..HEADER_LENGTH]);
    let index = u32::from_be_bytes(index);

    let ratchet = MegolmRatchet::from_slice(
        &bytes[HEADER_LENGTH..HEADER_LENGTH + RATCHET_LENGTH],
        index,
    )
    .ok_or_else(|| Error::SessionCreation("ratchet has the wrong length".to_string()))?;
    let signing_key = Ed25519PublicKey::from_slice(&bytes[HEADER_LENGTH + RATCHET_LENGTH..])
        .map_err(|err| Error::SessionCreation(err.to_string()))?;

    Ok(RatchetSnapshot {
        ratchet,
        signing_key,
    })
}

/// Encodes the signed session key that bootstraps inbound sessions:
/// `version || index || R0..R3 || public key || signature`.
pub(crate) fn encode_session_key(
    ratchet: &MegolmRatchet,
    signing_key: &Ed25519Keypair,
) -> Zeroizing<Vec<u8>> {
    let mut bytes = write_unsigned(SESSION_KEY_VERSION, ratchet, &signing_key.public_key());
    let signature = signing_key.sign(&bytes);
    bytes.extend_from_slice(&signature.to_bytes());
    bytes
}

/// Parses a session key and checks that it is signed by the key it carries.
pub(crate) fn decode_session_key(session_key: &str) -> Result<RatchetSnapshot, Error> {
    let bytes = Zeroizing::new(
        encoding::decode(session_key).map_err(|err| Error::SessionCreation(err.to_string()))?,
    );
    if bytes.len() != SESSION_KEY_LENGTH {
        return Err(Error::SessionCreation(format!(
            "expected {SESSION_KEY_LENGTH} bytes, got {}",
            bytes.len()
        )));
    }

    let (unsigned, signature) = bytes.split_at(EXPORT_LENGTH);
    let snapshot = read_unsigned(unsigned, SESSION_KEY_VERSION)?;

    let signature = Ed25519Signature::from_slice(signature)
        .map_err(|err| Error::SessionCreation(err.to_string()))?;
    snapshot
        .signing_key
        .verify(unsigned, &signature)
        .map_err(|err| Error::SessionCreation(err.to_string()))?;

    Ok(snapshot)
}

/// Encodes an unsigned export: `version || index || R0..R3 || public key`.
pub(crate) fn encode_export(
    ratchet: &MegolmRatchet,
    signing_key: &Ed25519PublicKey,
) -> Zeroizing<Vec<u8>> {
    write_unsigned(EXPORT_VERSION, ratchet, signing_key)
}

pub(crate) fn decode_export(exported: &str) -> Result<RatchetSnapshot, Error> {
    let bytes = Zeroizing::new(
        encoding::decode(exported).map_err(|err| Error::SessionCreation(err.to_string()))?,
    );
    read_unsigned(&bytes, EXPORT_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (MegolmRatchet, Ed25519Keypair) {
        let mut ratchet = MegolmRatchet::from_bytes(&[3u8; RATCHET_LENGTH], 0);
        ratchet.advance_to(300).unwrap();
        (ratchet, Ed25519Keypair::new().unwrap())
    }

    #[test]
    fn test_session_key_layout() {
        let (ratchet, signing_key) = sample();
        let bytes = encode_session_key(&ratchet, &signing_key);

        assert_eq!(bytes.len(), SESSION_KEY_LENGTH);
        assert_eq!(bytes[0], SESSION_KEY_VERSION);
        assert_eq!(&bytes[1..5], &300u32.to_be_bytes());

        let snapshot = decode_session_key(&encoding::encode(bytes.as_slice())).unwrap();
        assert_eq!(snapshot.ratchet.index(), 300);
        assert_eq!(snapshot.ratchet.to_bytes(), ratchet.to_bytes());
        assert_eq!(snapshot.signing_key, signing_key.public_key());
    }

    #[test]
    fn test_session_key_signature_is_checked() {
        let (ratchet, signing_key) = sample();
        let mut bytes = encode_session_key(&ratchet, &signing_key);
        bytes[10] ^= 1;

        assert!(matches!(
            decode_session_key(&encoding::encode(bytes.as_slice())),
            Err(Error::SessionCreation(_))
        ));
    }

    #[test]
    fn test_export_is_not_a_session_key() {
        let (ratchet, signing_key) = sample();
        let export =
            encoding::encode(encode_export(&ratchet, &signing_key.public_key()).as_slice());

        assert_eq!(decode_export(&export).unwrap().ratchet.index(), 300);
        assert!(matches!(
            decode_session_key(&export),
            Err(Error::SessionCreation(_))
        ));
        assert!(matches!(
            decode_export("@@@"),
            Err(Error::SessionCreation(_))
        ));
    }
}
