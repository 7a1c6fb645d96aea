use super::account::{session_config_from_proto, session_config_to_proto};
use super::{invalid, key_bytes, open, seal};
use crate::Error;
use crate::proto::{ReceiverChainProto, SenderChainProto, SessionProto, SkippedKeyProto};
use crate::ratchet::{Chain, DoubleRatchet, ReceiverChain, SenderChain, SkippedMessageKey};
use crate::session::{Role, Session, SessionKeys};
use crate::types::{X25519PublicKey, X25519Secret};
use tracing::warn;

impl Session {
    /// Pickles the session, encrypted under `pickle_key`.
    pub fn serialize(&self, pickle_key: &[u8]) -> Result<String, Error> {
        let ratchet = &self.ratchet;

        let proto = SessionProto {
            identity_key: self.session_keys.identity_key.to_bytes().to_vec(),
            base_key: self.session_keys.base_key.to_bytes().to_vec(),
            one_time_key: self.session_keys.one_time_key.to_bytes().to_vec(),
            initiator: self.role == Role::Initiator,
            received_message: self.received_message,
            root_key: ratchet.root_key.to_vec(),
            sender_chain: ratchet.sender_chain.as_ref().map(|sender| SenderChainProto {
                ratchet_key: sender.ratchet_key.to_bytes().to_vec(),
                chain_key: sender.chain.chain_key().to_vec(),
                index: sender.chain.index(),
            }),
            receiver_chains: ratchet
                .receiver_chains
                .iter()
                .map(|receiver| ReceiverChainProto {
                    ratchet_key: receiver.ratchet_key.to_bytes().to_vec(),
                    chain_key: receiver.chain.chain_key().to_vec(),
                    index: receiver.chain.index(),
                })
                .collect(),
            skipped_keys: ratchet
                .skipped_message_keys
                .iter()
                .map(|skipped| SkippedKeyProto {
                    ratchet_key: skipped.ratchet_key.to_bytes().to_vec(),
                    index: skipped.index,
                    message_key: skipped.message_key.to_vec(),
                })
                .collect(),
            config: Some(session_config_to_proto(&ratchet.config)),
        };

        seal(pickle_key, &proto)
    }

    /// Restores a session pickled with [`Session::serialize`].
    pub fn deserialize(pickle: &str, pickle_key: &[u8]) -> Result<Self, Error> {
        open::<SessionProto>(pickle, pickle_key)
            .and_then(|proto| Self::from_proto(&proto))
            .inspect_err(|err| warn!(error = %err, "failed to restore session"))
    }

    fn from_proto(proto: &SessionProto) -> Result<Self, Error> {
        let session_keys = SessionKeys {
            identity_key: X25519PublicKey::from_slice(&proto.identity_key).map_err(invalid)?,
            base_key: X25519PublicKey::from_slice(&proto.base_key).map_err(invalid)?,
            one_time_key: X25519PublicKey::from_slice(&proto.one_time_key).map_err(invalid)?,
        };

        let sender_chain = match &proto.sender_chain {
            Some(sender) => Some(SenderChain {
                ratchet_key: X25519Secret::from_slice(&sender.ratchet_key).map_err(invalid)?,
                chain: Chain::from_parts(
                    key_bytes(&sender.chain_key, "sender chain key")?,
                    sender.index,
                ),
            }),
            None => None,
        };

        let receiver_chains = proto
            .receiver_chains
            .iter()
            .map(|receiver| {
                Ok(ReceiverChain {
                    ratchet_key: X25519PublicKey::from_slice(&receiver.ratchet_key)
                        .map_err(invalid)?,
                    chain: Chain::from_parts(
                        key_bytes(&receiver.chain_key, "receiver chain key")?,
                        receiver.index,
                    ),
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let skipped_message_keys = proto
            .skipped_keys
            .iter()
            .map(|skipped| {
                Ok(SkippedMessageKey {
                    ratchet_key: X25519PublicKey::from_slice(&skipped.ratchet_key)
                        .map_err(invalid)?,
                    index: skipped.index,
                    message_key: key_bytes(&skipped.message_key, "message key")?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        if sender_chain.is_none() && receiver_chains.is_empty() {
            return Err(Error::Deserialization(
                "session has neither a sender nor a receiver chain".to_string(),
            ));
        }

        Ok(Self {
            session_keys,
            role: if proto.initiator {
                Role::Initiator
            } else {
                Role::Responder
            },
            received_message: proto.received_message,
            ratchet: DoubleRatchet {
                root_key: key_bytes(&proto.root_key, "root key")?,
                sender_chain,
                receiver_chains,
                skipped_message_keys,
                config: session_config_from_proto(proto.config.as_ref())?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{Account, Error, OlmMessage, PreKeyMessage, Session, X25519PublicKey};

    fn established_pair() -> (Session, Session) {
        let alice = Account::new(None).unwrap();
        let mut bob = Account::new(None).unwrap();
        bob.generate_one_time_keys(1).unwrap();
        let one_time_key =
            X25519PublicKey::from_base64(bob.one_time_keys().values().next().unwrap()).unwrap();

        let mut alice_session = alice
            .create_outbound_session(&bob.curve25519_key(), &one_time_key)
            .unwrap();
        let first = alice_session.encrypt(b"Hi").unwrap();
        let mut bob_session = bob
            .create_inbound_session(&PreKeyMessage::from_bytes(&first.body()).unwrap())
            .unwrap();
        bob_session.decrypt(&first).unwrap();

        (alice_session, bob_session)
    }

    #[test]
    fn test_session_roundtrip_keeps_ratchet() {
        let (mut alice_session, mut bob_session) = established_pair();

        let pending: Vec<OlmMessage> = (0..3)
            .map(|i| alice_session.encrypt(format!("pending {i}").as_bytes()).unwrap())
            .collect();
        bob_session.decrypt(&pending[2]).unwrap();

        let pickle = bob_session.serialize(b"key").unwrap();
        assert_eq!(bob_session.serialize(b"key").unwrap(), pickle);

        let mut restored = Session::deserialize(&pickle, b"key").unwrap();
        assert_eq!(restored.session_id(), bob_session.session_id());
        assert_eq!(restored.role(), bob_session.role());

        assert_eq!(restored.decrypt(&pending[0]).unwrap(), b"pending 0");
        assert_eq!(bob_session.decrypt(&pending[0]).unwrap(), b"pending 0");

        let reply = restored.encrypt(b"from the restored session").unwrap();
        assert_eq!(
            alice_session.decrypt(&reply).unwrap(),
            b"from the restored session"
        );
    }

    #[test]
    fn test_session_wrong_key() {
        let (alice_session, _) = established_pair();
        let pickle = alice_session.serialize(b"key").unwrap();

        assert!(matches!(
            Session::deserialize(&pickle, b"not the key"),
            Err(Error::Deserialization(_))
        ));
    }
}
