use crate::{Error, PreKeyBundle};
use serde::{Deserialize, Serialize};

/// Distinguishes a session-opening pairwise message from a steady-state one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairwiseMessageKind {
    /// Carries the pre-key material the receiver needs to open the session.
    Initial,
    /// Sent on an already established session.
    Steady,
}

/// Output of the pairwise session layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairwiseMessage {
    /// Whether this message opens the session.
    pub kind: PairwiseMessageKind,
    /// Opaque ciphertext.
    pub body: Vec<u8>,
}

/// The 1:1 double-ratchet session layer, consumed as a black box.
///
/// Implementations keep their own per-peer state, typically in the same
/// [`KeyStore`](crate::KeyStore) through its session entries.
pub trait PairwiseSessions {
    /// Whether a session with `identity` exists.
    fn has_session(&self, identity: &str) -> Result<bool, Error>;

    /// Opens a session from a verified bundle; a no-op when one already exists.
    fn establish(&mut self, identity: &str, bundle: &PreKeyBundle) -> Result<(), Error>;

    /// Encrypts a private payload for `identity`.
    fn encrypt(&mut self, identity: &str, plaintext: &[u8]) -> Result<PairwiseMessage, Error>;

    /// Decrypts a private payload from `identity`, opening the session if needed.
    fn decrypt(&mut self, identity: &str, message: &PairwiseMessage) -> Result<Vec<u8>, Error>;
}

/// The membership service's pre-key directory.
pub trait Directory {
    /// Fetches the bundle `identity` published when joining `group_id`.
    fn fetch_prekey_bundle(
        &mut self,
        group_id: &str,
        identity: &str,
    ) -> Result<PreKeyBundle, Error>;
}
