use super::generate_random_seed;
use crate::{Error, X25519PublicKey, X25519Secret};

/// Id of the single one-time pre-key every member publishes.
pub const ONE_TIME_PRE_KEY_ID: u32 = 5;

/// A one-time pre-key, consumed by the first peer that opens a pairwise session.
pub struct OneTimePreKey {
    pre_key: X25519Secret,
    id: u32,
}

impl OneTimePreKey {
    /// Creates a new one-time pre-key with the given ID.
    pub fn new(id: u32) -> Result<Self, Error> {
        Ok(Self {
            pre_key: X25519Secret::from(generate_random_seed()?),
            id,
        })
    }

    /// Returns the public component of this pre-key.
    pub fn public_key(&self) -> X25519PublicKey {
        self.pre_key.public_key()
    }

    /// Returns the identifier for this pre-key.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Serializes the one-time pre-key to a 36-byte array: big-endian id, then the private key.
    pub fn to_bytes(&self) -> [u8; 36] {
        let mut result = [0u8; 36];

        result[0..4].copy_from_slice(&self.id.to_be_bytes());
        result[4..].copy_from_slice(self.pre_key.as_bytes());

        result
    }
}

impl From<[u8; 36]> for OneTimePreKey {
    fn from(bytes: [u8; 36]) -> Self {
        let id = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);

        let mut key_bytes = Box::new([0u8; 32]);
        key_bytes.copy_from_slice(&bytes[4..]);

        Self {
            pre_key: X25519Secret::from(key_bytes),
            id,
        }
    }
}
