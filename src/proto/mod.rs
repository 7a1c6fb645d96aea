//! Protocol buffer bodies for wire messages and pickles.

use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct MessageProto {
    #[prost(bytes = "vec", tag = "1")]
    pub ratchet_key: Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub chain_index: u32,
    #[prost(bytes = "vec", tag = "4")]
    pub ciphertext: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct PreKeyMessageProto {
    #[prost(bytes = "vec", tag = "1")]
    pub one_time_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub base_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub identity_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub message: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct GroupMessageProto {
    #[prost(uint32, tag = "1")]
    pub message_index: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub ciphertext: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct SessionConfigProto {
    #[prost(uint64, tag = "1")]
    pub max_skipped_message_keys: u64,
    #[prost(uint64, tag = "2")]
    pub max_receiver_chains: u64,
    #[prost(uint32, tag = "3")]
    pub max_message_gap: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub(crate) struct AccountConfigProto {
    #[prost(uint64, tag = "1")]
    pub max_one_time_keys: u64,
    #[prost(message, optional, tag = "2")]
    pub session: Option<SessionConfigProto>,
}

#[derive(Clone, PartialEq, prost::Message, Zeroize, ZeroizeOnDrop)]
pub(crate) struct OneTimeKeyProto {
    #[prost(uint32, tag = "1")]
    pub key_id: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub secret: Vec<u8>,
    #[prost(bool, tag = "3")]
    pub published: bool,
}

#[derive(Clone, PartialEq, prost::Message, Zeroize, ZeroizeOnDrop)]
pub(crate) struct AccountProto {
    #[prost(bytes = "vec", tag = "1")]
    pub identity_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub signing_key: Vec<u8>,
    #[prost(message, repeated, tag = "3")]
    pub one_time_keys: Vec<OneTimeKeyProto>,
    #[prost(uint32, tag = "4")]
    pub next_key_id: u32,
    #[zeroize(skip)]
    #[prost(message, optional, tag = "5")]
    pub config: Option<AccountConfigProto>,
}

#[derive(Clone, PartialEq, prost::Message, Zeroize, ZeroizeOnDrop)]
pub(crate) struct SenderChainProto {
    #[prost(bytes = "vec", tag = "1")]
    pub ratchet_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub chain_key: Vec<u8>,
    #[prost(uint32, tag = "3")]
    pub index: u32,
}

#[derive(Clone, PartialEq, prost::Message, Zeroize, ZeroizeOnDrop)]
pub(crate) struct ReceiverChainProto {
    #[prost(bytes = "vec", tag = "1")]
    pub ratchet_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub chain_key: Vec<u8>,
    #[prost(uint32, tag = "3")]
    pub index: u32,
}

#[derive(Clone, PartialEq, prost::Message, Zeroize, ZeroizeOnDrop)]
pub(crate) struct SkippedKeyProto {
    #[prost(bytes = "vec", tag = "1")]
    pub ratchet_key: Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub index: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub message_key: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message, Zeroize, ZeroizeOnDrop)]
pub(crate) struct SessionProto {
    #[prost(bytes = "vec", tag = "1")]
    pub identity_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub base_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub one_time_key: Vec<u8>,
    #[prost(bool, tag = "4")]
    pub initiator: bool,
    #[prost(bool, tag = "5")]
    pub received_message: bool,
    #[prost(bytes = "vec", tag = "6")]
    pub root_key: Vec<u8>,
    #[prost(message, optional, tag = "7")]
    pub sender_chain: Option<SenderChainProto>,
    #[prost(message, repeated, tag = "8")]
    pub receiver_chains: Vec<ReceiverChainProto>,
    #[prost(message, repeated, tag = "9")]
    pub skipped_keys: Vec<SkippedKeyProto>,
    #[zeroize(skip)]
    #[prost(message, optional, tag = "10")]
    pub config: Option<SessionConfigProto>,
}

#[derive(Clone, PartialEq, prost::Message, Zeroize, ZeroizeOnDrop)]
pub(crate) struct OutboundGroupSessionProto {
    #[prost(bytes = "vec", tag = "1")]
    pub ratchet: Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub counter: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub signing_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub session_key: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message, Zeroize, ZeroizeOnDrop)]
pub(crate) struct InboundGroupSessionProto {
    #[prost(bytes = "vec", tag = "1")]
    pub initial_ratchet: Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub initial_counter: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub latest_ratchet: Vec<u8>,
    #[prost(uint32, tag = "4")]
    pub latest_counter: u32,
    #[prost(bytes = "vec", tag = "5")]
    pub signing_key: Vec<u8>,
    #[prost(bool, tag = "6")]
    pub verified: bool,
}
