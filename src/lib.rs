//! Sender-key group messaging layered on pairwise Signal sessions.
//!
//! Every member of a group owns one symmetric sender key ratchet. Its
//! position is handed to each peer privately over a pairwise session, after
//! which one signed ciphertext per message reaches the whole group.

pub mod account;

mod config;
pub use config::GroupConfig;

mod error;
pub use error::Error;

mod group;
pub use group::*;

mod identity;
pub use identity::*;

pub mod padding;

mod proto;

mod sender_key;
pub use sender_key::*;

mod serde_base64;

mod store;
pub use store::*;

mod types;
pub use types::*;
