//! Group session orchestration: the join handshake and channel traffic.

mod envelope;
pub use envelope::*;
mod member;
pub use member::*;
mod pairwise;
pub use pairwise::*;
