/// Errors that can occur during group messaging operations.
///
/// Per-message protocol failures leave the persisted record exactly as it was;
/// the caller drops the message in hand. See [`Error::is_droppable`].
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// No sender key state exists for the requested name.
    #[error("No sender key session for {0}")]
    NoSession(String),

    /// The message references a sender key epoch that was never received.
    #[error("Unknown sender key id: {0}")]
    UnknownKeyId(u32),

    /// The message signature does not verify against the sender's key.
    #[error("Invalid sender key message signature")]
    InvalidSignature,

    /// The iteration was already consumed (or never buffered).
    #[error("Duplicate message: iteration {iteration}, chain at {current}")]
    DuplicateMessage {
        /// Iteration claimed by the message.
        iteration: u32,
        /// Current chain iteration of the receiving state.
        current: u32,
    },

    /// The iteration is too far ahead of the current chain position.
    #[error("Message too far in the future: iteration {iteration}, chain at {current}")]
    FutureMessage {
        /// Iteration claimed by the message.
        iteration: u32,
        /// Current chain iteration of the receiving state.
        current: u32,
    },

    /// The group message body failed authenticated decryption.
    #[error("Group message failed authentication")]
    InvalidCiphertext,

    /// The sender chain cannot advance past its last iteration.
    #[error("Sender chain exhausted at iteration {0}")]
    ChainExhausted(u32),

    /// A message or envelope failed shape validation.
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// A cryptographic operation failed.
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    /// Pre-key operation failed.
    #[error("Pre-key error: {0}")]
    PreKey(String),

    /// Random number generation failed.
    #[error("Random number generation failed")]
    Random,

    /// Serialization or deserialization of persisted state failed.
    #[error("Serialization/deserialization failed: {0}")]
    Serde(String),

    /// The key store backend failed.
    #[error("Key store error: {0}")]
    Storage(String),

    /// The pairwise session layer failed.
    #[error("Pairwise session error: {0}")]
    Pairwise(String),

    /// The membership directory failed.
    #[error("Directory error: {0}")]
    Directory(String),

    /// Plaintext does not fit the 16-bit length prefix.
    #[error("Payload of {0} bytes is too large to frame")]
    PayloadTooLarge(usize),
}

impl Error {
    /// Whether the caller should drop the offending message and carry on.
    pub fn is_droppable(&self) -> bool {
        matches!(
            self,
            Self::NoSession(_)
                | Self::UnknownKeyId(_)
                | Self::InvalidSignature
                | Self::DuplicateMessage { .. }
                | Self::FutureMessage { .. }
                | Self::InvalidCiphertext
                | Self::ChainExhausted(_)
                | Self::Malformed(_)
        )
    }
}

impl From<aes_gcm_siv::Error> for Error {
    fn from(value: aes_gcm_siv::Error) -> Self {
        Self::Crypto(value.to_string())
    }
}

impl From<prost::DecodeError> for Error {
    fn from(value: prost::DecodeError) -> Self {
        Self::Malformed(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value.to_string())
    }
}
