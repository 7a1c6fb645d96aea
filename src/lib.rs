//! End-to-end encryption primitives for messaging: pairwise double-ratchet
//! sessions bootstrapped from one-time keys, Megolm-style group sessions and
//! passphrase-encrypted pickles for both.

mod account;
pub use account::{Account, IdentityKeys, KeyId};

mod config;
pub use config::{AccountConfig, MAX_ONE_TIME_KEYS, SessionConfig};

mod crypto;
mod encoding;

mod error;
pub use error::{DecodeError, Error};

mod megolm;
pub use megolm::{DecryptedMessage, InboundGroupSession, OutboundGroupSession};

mod pickle;
mod proto;
mod ratchet;

mod releasable;
pub use releasable::Releasable;

mod session;
pub use session::*;

mod types;
pub use types::{Ed25519PublicKey, Ed25519Signature, SIGNATURE_LENGTH, X25519PublicKey};

pub mod utility;

mod x3dh;
