use super::KeyStore;
use crate::{Error, IdentityKey, OneTimePreKey, SenderKeyName, SenderKeyRecord, SignedPreKey};
use std::collections::HashMap;

const IDENTITY_KEY: &str = "identity_key";
const REGISTRATION_ID: &str = "registration_id";

fn pre_key_key(id: u32) -> String {
    format!("pre_key::{id}")
}

fn signed_pre_key_key(id: u32) -> String {
    format!("signed_pre_key::{id}")
}

fn session_key(identity: &str) -> String {
    format!("session::{identity}")
}

// Length prefixes keep ids containing the separator from colliding
fn sender_key_key(name: &SenderKeyName) -> String {
    let group_id = name.group_id();
    let sender = name.sender();
    format!(
        "sender_key::{}:{group_id}::{}:{sender}::{}",
        group_id.len(),
        sender.len(),
        name.device_index()
    )
}

fn fixed<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N], Error> {
    bytes.try_into().map_err(|_| {
        Error::Serde(format!(
            "Stored {what} has {} bytes, expected {N}",
            bytes.len()
        ))
    })
}

/// In-process [`KeyStore`] keeping every value in its encoded form.
///
/// Values go through the same byte encodings a durable backend would use, so
/// loads always hand out fresh copies.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryKeyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was stored yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    fn put(&mut self, key: String, value: Vec<u8>) {
        self.entries.insert(key, value);
    }
}

impl KeyStore for MemoryKeyStore {
    fn load_identity_key(&self) -> Result<Option<IdentityKey>, Error> {
        self.get(IDENTITY_KEY)
            .map(|bytes| fixed::<64>(bytes, "identity key").map(IdentityKey::from))
            .transpose()
    }

    fn store_identity_key(&mut self, identity_key: &IdentityKey) -> Result<(), Error> {
        self.put(IDENTITY_KEY.to_string(), identity_key.to_bytes().to_vec());
        Ok(())
    }

    fn load_registration_id(&self) -> Result<Option<u32>, Error> {
        self.get(REGISTRATION_ID)
            .map(|bytes| fixed::<4>(bytes, "registration id").map(u32::from_be_bytes))
            .transpose()
    }

    fn store_registration_id(&mut self, registration_id: u32) -> Result<(), Error> {
        self.put(
            REGISTRATION_ID.to_string(),
            registration_id.to_be_bytes().to_vec(),
        );
        Ok(())
    }

    fn load_pre_key(&self, id: u32) -> Result<Option<OneTimePreKey>, Error> {
        self.get(&pre_key_key(id))
            .map(|bytes| fixed::<36>(bytes, "pre-key").map(OneTimePreKey::from))
            .transpose()
    }

    fn store_pre_key(&mut self, pre_key: &OneTimePreKey) -> Result<(), Error> {
        self.put(pre_key_key(pre_key.id()), pre_key.to_bytes().to_vec());
        Ok(())
    }

    fn remove_pre_key(&mut self, id: u32) -> Result<(), Error> {
        self.entries.remove(&pre_key_key(id));
        Ok(())
    }

    fn load_signed_pre_key(&self, id: u32) -> Result<Option<SignedPreKey>, Error> {
        self.get(&signed_pre_key_key(id))
            .map(|bytes| fixed::<36>(bytes, "signed pre-key").map(SignedPreKey::from))
            .transpose()
    }

    fn store_signed_pre_key(&mut self, signed_pre_key: &SignedPreKey) -> Result<(), Error> {
        self.put(
            signed_pre_key_key(signed_pre_key.id()),
            signed_pre_key.to_bytes().to_vec(),
        );
        Ok(())
    }

    fn load_session(&self, identity: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.get(&session_key(identity)).map(<[u8]>::to_vec))
    }

    fn store_session(&mut self, identity: &str, session: &[u8]) -> Result<(), Error> {
        self.put(session_key(identity), session.to_vec());
        Ok(())
    }

    fn load_sender_key(&self, name: &SenderKeyName) -> Result<SenderKeyRecord, Error> {
        match self.get(&sender_key_key(name)) {
            Some(bytes) => SenderKeyRecord::deserialize(bytes),
            None => Ok(SenderKeyRecord::new()),
        }
    }

    fn store_sender_key(
        &mut self,
        name: &SenderKeyName,
        record: &SenderKeyRecord,
    ) -> Result<(), Error> {
        self.put(sender_key_key(name), record.serialize());
        Ok(())
    }
}
