use super::{invalid, open, seal, to_usize};
use crate::account::{KeyId, OneTimeKey, OneTimeKeyStore};
use crate::config::{AccountConfig, SessionConfig};
use crate::proto::{AccountConfigProto, AccountProto, OneTimeKeyProto, SessionConfigProto};
use crate::types::{Ed25519Keypair, X25519Secret};
use crate::{Account, Error};
use std::collections::BTreeMap;
use tracing::warn;

pub(super) fn session_config_to_proto(config: &SessionConfig) -> SessionConfigProto {
    SessionConfigProto {
        max_skipped_message_keys: config.max_skipped_message_keys as u64,
        max_receiver_chains: config.max_receiver_chains as u64,
        max_message_gap: config.max_message_gap,
    }
}

pub(super) fn session_config_from_proto(
    proto: Option<&SessionConfigProto>,
) -> Result<SessionConfig, Error> {
    let proto = proto.ok_or_else(|| Error::Deserialization("missing session config".to_string()))?;

    Ok(SessionConfig {
        max_skipped_message_keys: to_usize(
            proto.max_skipped_message_keys,
            "max_skipped_message_keys",
        )?,
        max_receiver_chains: to_usize(proto.max_receiver_chains, "max_receiver_chains")?,
        max_message_gap: proto.max_message_gap,
    })
}

impl Account {
    /// Pickles the account, encrypted under `pickle_key`.
    pub fn serialize(&self, pickle_key: &[u8]) -> Result<String, Error> {
        let one_time_keys = self
            .one_time_keys
            .keys
            .iter()
            .map(|(key_id, key)| OneTimeKeyProto {
                key_id: key_id.0,
                secret: key.secret.to_bytes().to_vec(),
                published: key.published,
            })
            .collect();

        let proto = AccountProto {
            identity_key: self.identity_key.to_bytes().to_vec(),
            signing_key: self.signing_key.to_bytes().to_vec(),
            one_time_keys,
            next_key_id: self.one_time_keys.next_key_id,
            config: Some(AccountConfigProto {
                max_one_time_keys: self.config.max_one_time_keys as u64,
                session: Some(session_config_to_proto(&self.config.session)),
            }),
        };

        seal(pickle_key, &proto)
    }

    /// Restores an account pickled with [`Account::serialize`].
    pub fn deserialize(pickle: &str, pickle_key: &[u8]) -> Result<Self, Error> {
        open::<AccountProto>(pickle, pickle_key)
            .and_then(|proto| Self::from_proto(&proto))
            .inspect_err(|err| warn!(error = %err, "failed to restore account"))
    }

    fn from_proto(proto: &AccountProto) -> Result<Self, Error> {
        let config_proto = proto
            .config
            .as_ref()
            .ok_or_else(|| Error::Deserialization("missing account config".to_string()))?;
        let config = AccountConfig {
            max_one_time_keys: to_usize(config_proto.max_one_time_keys, "max_one_time_keys")?,
            session: session_config_from_proto(config_proto.session.as_ref())?,
        };

        let mut keys = BTreeMap::new();
        for key in &proto.one_time_keys {
            let one_time_key = OneTimeKey {
                secret: X25519Secret::from_slice(&key.secret).map_err(invalid)?,
                published: key.published,
            };
            if keys.insert(KeyId(key.key_id), one_time_key).is_some() {
                return Err(Error::Deserialization(format!(
                    "duplicate one-time key id {}",
                    key.key_id
                )));
            }
        }

        Ok(Self {
            identity_key: X25519Secret::from_slice(&proto.identity_key).map_err(invalid)?,
            signing_key: Ed25519Keypair::from_slice(&proto.signing_key).map_err(invalid)?,
            one_time_keys: OneTimeKeyStore {
                keys,
                next_key_id: proto.next_key_id,
                max_keys: config.max_one_time_keys,
            },
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{Account, AccountConfig, Error, SessionConfig};

    #[test]
    fn test_account_roundtrip() {
        let config = AccountConfig {
            max_one_time_keys: 7,
            session: SessionConfig {
                max_skipped_message_keys: 3,
                max_receiver_chains: 2,
                max_message_gap: 10,
            },
        };
        let mut account = Account::new(Some(config.clone())).unwrap();
        account.generate_one_time_keys(2).unwrap();
        account.mark_keys_as_published();
        account.generate_one_time_keys(3).unwrap();

        let pickle = account.serialize(b"pickle key").unwrap();
        let mut restored = Account::deserialize(&pickle, b"pickle key").unwrap();

        assert_eq!(restored.identity_keys(), account.identity_keys());
        assert_eq!(restored.one_time_keys(), account.one_time_keys());
        assert_eq!(restored.config(), &config);
        assert_eq!(restored.sign(b"message"), account.sign(b"message"));
        assert_eq!(restored.serialize(b"pickle key").unwrap(), pickle);

        // Key ids keep counting from where the original account stopped.
        restored.generate_one_time_keys(1).unwrap();
        assert!(restored.one_time_keys().contains_key("AAAABQ"));
    }

    #[test]
    fn test_account_wrong_key() {
        let account = Account::new(None).unwrap();
        let pickle = account.serialize(b"pickle key").unwrap();

        assert!(matches!(
            Account::deserialize(&pickle, b"other key"),
            Err(Error::Deserialization(_))
        ));
    }
}
