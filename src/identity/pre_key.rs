use super::generate_random_seed;
use crate::{Error, IdentityKey, X25519PublicKey, X25519Secret};
use ed25519_dalek::Signature;

/// Id every member publishes its signed pre-key under.
pub const SIGNED_PRE_KEY_ID: u32 = 1;

/// A medium-term pre-key signed with the identity key.
///
/// The signature lets a peer check that the pre-key in a bundle really
/// belongs to the identity it is published next to.
pub struct SignedPreKey {
    pre_key: X25519Secret,
    id: u32,
}

impl SignedPreKey {
    /// Creates a new signed pre-key with the given ID.
    pub fn new(id: u32) -> Result<Self, Error> {
        Ok(Self {
            pre_key: X25519Secret::from(generate_random_seed()?),
            id,
        })
    }

    /// Returns the public component of this signed pre-key.
    pub fn public_key(&self) -> X25519PublicKey {
        self.pre_key.public_key()
    }

    /// Returns the identifier for this signed pre-key.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Signs the public pre-key with the provided identity key.
    pub fn signature(&self, identity_key: &IdentityKey) -> Signature {
        identity_key.sign(self.public_key().as_bytes())
    }

    /// Serializes the signed pre-key to a 36-byte array.
    ///
    /// The format is:
    /// - 4 bytes: ID (big-endian u32)
    /// - 32 bytes: X25519 private key
    pub fn to_bytes(&self) -> [u8; 36] {
        let mut result = [0u8; 36];

        result[0..4].copy_from_slice(&self.id.to_be_bytes());
        result[4..].copy_from_slice(self.pre_key.as_bytes());

        result
    }
}

impl From<[u8; 36]> for SignedPreKey {
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
