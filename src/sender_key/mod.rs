//! The sender key group ratchet.
//!
//! Each member owns one symmetric chain per group and hands its current
//! position to every peer in a distribution message. Group messages are
//! encrypted once with the sender's chain and signed with a per-chain
//! Ed25519 key, so peers can verify but never forge them.

mod builder;
pub use builder::GroupSessionBuilder;
mod chain;
pub use chain::*;
mod cipher;
pub use cipher::GroupCipher;
mod message;
pub use message::*;
mod name;
pub use name::*;
mod record;
pub use record::SenderKeyRecord;
mod state;
pub use state::SenderKeyState;
