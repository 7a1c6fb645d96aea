use super::{invalid, open, seal};
use crate::Error;
use crate::megolm::{InboundGroupSession, MegolmRatchet, OutboundGroupSession};
use crate::proto::{InboundGroupSessionProto, OutboundGroupSessionProto};
use crate::types::{Ed25519Keypair, Ed25519PublicKey};
use tracing::warn;
use zeroize::Zeroizing;

fn ratchet_from_proto(bytes: &[u8], counter: u32) -> Result<MegolmRatchet, Error> {
    MegolmRatchet::from_slice(bytes, counter)
        .ok_or_else(|| Error::Deserialization("ratchet has the wrong length".to_string()))
}

impl OutboundGroupSession {
    /// Pickles the session, encrypted under `pickle_key`.
    pub fn serialize(&self, pickle_key: &[u8]) -> Result<String, Error> {
        let proto = OutboundGroupSessionProto {
            ratchet: self.ratchet.to_bytes().to_vec(),
            counter: self.ratchet.index(),
            signing_key: self.signing_key.to_bytes().to_vec(),
            session_key: self.session_key.to_vec(),
        };

        seal(pickle_key, &proto)
    }

    /// Restores a session pickled with [`OutboundGroupSession::serialize`].
    pub fn deserialize(pickle: &str, pickle_key: &[u8]) -> Result<Self, Error> {
        open::<OutboundGroupSessionProto>(pickle, pickle_key)
            .and_then(|proto| {
                Ok(Self {
                    ratchet: ratchet_from_proto(&proto.ratchet, proto.counter)?,
                    signing_key: Ed25519Keypair::from_slice(&proto.signing_key)
                        .map_err(invalid)?,
                    session_key: Zeroizing::new(proto.session_key.clone()),
                })
            })
            .inspect_err(|err| warn!(error = %err, "failed to restore outbound group session"))
    }
}

impl InboundGroupSession {
    /// Pickles the session, encrypted under `pickle_key`.
    pub fn serialize(&self, pickle_key: &[u8]) -> Result<String, Error> {
        let proto = InboundGroupSessionProto {
            initial_ratchet: self.initial_ratchet.to_bytes().to_vec(),
            initial_counter: self.initial_ratchet.index(),
            latest_ratchet: self.latest_ratchet.to_bytes().to_vec(),
            latest_counter: self.latest_ratchet.index(),
            signing_key: self.signing_key.as_bytes().to_vec(),
            verified: self.verified,
        };

        seal(pickle_key, &proto)
    }

    /// Restores a session pickled with [`InboundGroupSession::serialize`].
    ///
    /// The `verified` flag is carried over unchanged.
    pub fn deserialize(pickle: &str, pickle_key: &[u8]) -> Result<Self, Error> {
        open::<InboundGroupSessionProto>(pickle, pickle_key)
            .and_then(|proto| {
                if proto.latest_counter < proto.initial_counter {
                    return Err(Error::Deserialization(
                        "latest ratchet is behind the initial ratchet".to_string(),
                    ));
                }

                Ok(Self {
                    initial_ratchet: ratchet_from_proto(
                        &proto.initial_ratchet,
                        proto.initial_counter,
                    )?,
                    latest_ratchet: ratchet_from_proto(
                        &proto.latest_ratchet,
                        proto.latest_counter,
                    )?,
                    signing_key: Ed25519PublicKey::from_slice(&proto.signing_key)
                        .map_err(invalid)?,
                    verified: proto.verified,
                })
            })
            .inspect_err(|err| warn!(error = %err, "failed to restore inbound group session"))
    }
}
