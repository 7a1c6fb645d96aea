//! Megolm group sessions: one sender ratchet shared with many receivers.

mod inbound;
mod message;
mod outbound;
mod ratchet;
mod session_key;

pub use inbound::{DecryptedMessage, InboundGroupSession};
pub use outbound::OutboundGroupSession;
pub(crate) use ratchet::MegolmRatchet;

const MESSAGE_KEY_INFO: &[u8] = b"Olmkit-Megolm-Keys";
