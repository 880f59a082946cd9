//! Persistence contract for everything one local identity keeps.
//!
//! Every operation is a plain load or store keyed by an exact identifier.
//! Implementations do no caching or locking of their own; callers hold the
//! store by `&mut` for the duration of a read-modify-write.

mod memory;
pub use memory::MemoryKeyStore;

use crate::{Error, IdentityKey, OneTimePreKey, SenderKeyName, SenderKeyRecord, SignedPreKey};

/// Typed key-value storage for identity material, sessions and sender keys.
pub trait KeyStore {
    /// Loads the local identity key pair.
    fn load_identity_key(&self) -> Result<Option<IdentityKey>, Error>;

    /// Stores the local identity key pair.
    fn store_identity_key(&mut self, identity_key: &IdentityKey) -> Result<(), Error>;

    /// Loads the local registration id.
    fn load_registration_id(&self) -> Result<Option<u32>, Error>;

    /// Stores the local registration id.
    fn store_registration_id(&mut self, registration_id: u32) -> Result<(), Error>;

    /// Loads a one-time pre-key by id.
    fn load_pre_key(&self, id: u32) -> Result<Option<OneTimePreKey>, Error>;

    /// Stores a one-time pre-key under its id.
    fn store_pre_key(&mut self, pre_key: &OneTimePreKey) -> Result<(), Error>;

    /// Removes a consumed one-time pre-key.
    fn remove_pre_key(&mut self, id: u32) -> Result<(), Error>;

    /// Loads a signed pre-key by id.
    fn load_signed_pre_key(&self, id: u32) -> Result<Option<SignedPreKey>, Error>;

    /// Stores a signed pre-key under its id.
    fn store_signed_pre_key(&mut self, signed_pre_key: &SignedPreKey) -> Result<(), Error>;

    /// Loads the opaque pairwise session state for a peer identity.
    fn load_session(&self, identity: &str) -> Result<Option<Vec<u8>>, Error>;

    /// Stores the opaque pairwise session state for a peer identity.
    fn store_session(&mut self, identity: &str, session: &[u8]) -> Result<(), Error>;

    /// Loads the sender key record for `name`; absent records load as empty.
    fn load_sender_key(&self, name: &SenderKeyName) -> Result<SenderKeyRecord, Error>;

    /// Stores the sender key record for `name`.
    fn store_sender_key(
        &mut self,
        name: &SenderKeyName,
        record: &SenderKeyRecord,
    ) -> Result<(), Error>;
}
