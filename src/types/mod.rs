mod ed25519;
mod x25519;

pub(crate) use ed25519::Ed25519Keypair;
pub use ed25519::{Ed25519PublicKey, Ed25519Signature, SIGNATURE_LENGTH};
pub(crate) use x25519::X25519Secret;
pub use x25519::X25519PublicKey;
