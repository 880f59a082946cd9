use super::generate_random_seed;
use crate::{Error, X25519PublicKey, X25519Secret};
use ed25519_dalek::{SecretKey, Signature, Signer, SigningKey, VerifyingKey};
use zeroize::Zeroize;

/// Length of the public identity as published in a pre-key bundle.
pub const IDENTITY_PUBLIC_LENGTH: usize = 64;

/// Long-term identity key pair that combines signing and key agreement capabilities.
///
/// The Ed25519 half signs pre-keys; the X25519 half is what the pairwise
/// session layer agrees keys with. Both are derived from the same seed.
pub struct IdentityKey {
    signing_key: Box<SigningKey>,
    dh_key: X25519Secret,
}

impl IdentityKey {
    /// Creates a new identity key with randomly generated components.
    pub fn new() -> Result<Self, Error> {
        let seed = generate_random_seed()?;
        let signing_key = Box::new(SigningKey::from(SecretKey::from(*seed)));
        let dh_key = X25519Secret::from(seed);

        Ok(Self {
            signing_key,
            dh_key,
        })
    }

    /// Signs a message using the Ed25519 signing key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Verifies a signature using this identity's public key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), Error> {
        self.signing_key
            .verifying_key()
            .verify_strict(message, signature)
            .map_err(|_| Error::InvalidSignature)
    }

    /// Returns the public Ed25519 signing key for this identity.
    pub fn signing_key_public(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Returns the public X25519 key for Diffie-Hellman operations.
    pub fn dh_key_public(&self) -> X25519PublicKey {
        self.dh_key.public_key()
    }

    /// Public identity as published: X25519 key followed by the Ed25519 key.
    pub fn public_bytes(&self) -> [u8; IDENTITY_PUBLIC_LENGTH] {
        let mut bytes = [0u8; IDENTITY_PUBLIC_LENGTH];
        bytes[0..32].copy_from_slice(self.dh_key_public().as_bytes());
        bytes[32..64].copy_from_slice(self.signing_key_public().as_bytes());

        bytes
    }

    /// Serializes the identity key to a 64-byte array.
    ///
    /// The first 32 bytes contain the Ed25519 private key,
    /// and the last 32 bytes contain the X25519 private key.
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[0..32].copy_from_slice(self.signing_key.as_bytes().as_slice());
        bytes[32..64].copy_from_slice(self.dh_key.as_bytes());

        bytes
    }
}

impl From<[u8; 64]> for IdentityKey {
    fn from(mut bytes: [u8; 64]) -> Self {
        let mut signing_bytes = Box::new([0u8; 32]);
        signing_bytes.copy_from_slice(&bytes[0..32]);
        let signing_key = Box::new(SigningKey::from_bytes(&signing_bytes));
        signing_bytes.zeroize();

        let mut dh_bytes = Box::new([0u8; 32]);
        dh_bytes.copy_from_slice(&bytes[32..64]);
        let dh_key = X25519Secret::from(dh_bytes);

        bytes.zeroize();

        Self {
            signing_key,
            dh_key,
        }
    }
}
