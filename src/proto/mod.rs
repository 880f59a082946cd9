//! Protobuf wire and storage models, derived with prost.

use prost::Message;

/// Body of a group message, signed together with the version byte.
#[derive(Clone, PartialEq, Message)]
pub(crate) struct SenderKeyMessageProto {
    #[prost(uint32, tag = "1")]
    pub(crate) key_id: u32,
    #[prost(uint32, tag = "2")]
    pub(crate) iteration: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub(crate) ciphertext: Vec<u8>,
}

/// Everything a peer needs to follow one sender's chain.
#[derive(Clone, PartialEq, Message)]
pub(crate) struct SenderKeyDistributionMessageProto {
    #[prost(uint32, tag = "1")]
    pub(crate) key_id: u32,
    #[prost(uint32, tag = "2")]
    pub(crate) iteration: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub(crate) chain_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub(crate) signing_key: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct SenderChainKeyProto {
    #[prost(uint32, tag = "1")]
    pub(crate) iteration: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub(crate) seed: Vec<u8>,
}

/// Skipped message keys are stored by seed and re-derived on load.
#[derive(Clone, PartialEq, Message)]
pub(crate) struct SenderMessageKeyProto {
    #[prost(uint32, tag = "1")]
    pub(crate) iteration: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub(crate) seed: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct SenderSigningKeyProto {
    #[prost(bytes = "vec", tag = "1")]
    pub(crate) public_key: Vec<u8>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub(crate) private_key: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct SenderKeyStateProto {
    #[prost(uint32, tag = "1")]
    pub(crate) key_id: u32,
    #[prost(message, optional, tag = "2")]
    pub(crate) chain_key: Option<SenderChainKeyProto>,
    #[prost(message, optional, tag = "3")]
    pub(crate) signing_key: Option<SenderSigningKeyProto>,
    #[prost(message, repeated, tag = "4")]
    pub(crate) message_keys: Vec<SenderMessageKeyProto>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct SenderKeyRecordProto {
    #[prost(uint32, tag = "1")]
    pub(crate) version: u32,
    #[prost(message, repeated, tag = "2")]
    pub(crate) states: Vec<SenderKeyStateProto>,
    #[prost(uint32, optional, tag = "3")]
    pub(crate) sending_key_id: Option<u32>,
}
