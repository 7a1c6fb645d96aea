use crate::Error;
use crate::crypto::hkdf_expand;
use crate::types::{X25519PublicKey, X25519Secret};
use x25519_dalek::SharedSecret;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

const ROOT_INFO: &[u8] = b"Olmkit-Root";

/// Root key and first chain key derived from the triple Diffie-Hellman
/// handshake that opens a pairwise session.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct X3DHSharedSecret {
    pub(crate) root_key: Box<[u8; 32]>,
    pub(crate) chain_key: Box<[u8; 32]>,
}

/// Initiator side of the handshake.
///
/// Combines our identity key and a fresh base key with the responder's
/// identity key and one of their one-time keys:
/// `DH(I_A, O_B) || DH(E_A, I_B) || DH(E_A, O_B)`.
pub(crate) fn initiate(
    identity_key: &X25519Secret,
    base_key: &X25519Secret,
    their_identity_key: &X25519PublicKey,
    their_one_time_key: &X25519PublicKey,
) -> Result<X3DHSharedSecret, Error> {
    let dh1 = identity_key.dh(their_one_time_key);
    let dh2 = base_key.dh(their_identity_key);
    let dh3 = base_key.dh(their_one_time_key);

    calculate_shared_secret(dh1, dh2, dh3)
}

/// Responder side of the handshake, mirroring [`initiate`].
pub(crate) fn respond(
    identity_key: &X25519Secret,
    one_time_key: &X25519Secret,
    their_identity_key: &X25519PublicKey,
    their_base_key: &X25519PublicKey,
) -> Result<X3DHSharedSecret, Error> {
    let dh1 = one_time_key.dh(their_identity_key);
    let dh2 = identity_key.dh(their_base_key);
    let dh3 = one_time_key.dh(their_base_key);

    calculate_shared_secret(dh1, dh2, dh3)
}

fn calculate_shared_secret(
    dh1: SharedSecret,
    dh2: SharedSecret,
    dh3: SharedSecret,
) -> Result<X3DHSharedSecret, Error> {
    if !(dh1.was_contributory() && dh2.was_contributory() && dh3.was_contributory()) {
        return Err(Error::SessionInit(
            "key agreement produced a non-contributory secret".to_string(),
        ));
    }

    let mut key_material = Zeroizing::new([0u8; 96]);
    key_material[0..32].copy_from_slice(dh1.as_bytes());
    key_material[32..64].copy_from_slice(dh2.as_bytes());
    key_material[64..96].copy_from_slice(dh3.as_bytes());

    let derived = hkdf_expand::<64>(None, key_material.as_slice(), ROOT_INFO)
        .map_err(|err| Error::SessionInit(err.to_string()))?;

    let mut root_key = Box::new([0u8; 32]);
    let mut chain_key = Box::new([0u8; 32]);
    root_key.copy_from_slice(&derived[..32]);
    chain_key.copy_from_slice(&derived[32..]);

    Ok(X3DHSharedSecret {
        root_key,
        chain_key,
    })
}
