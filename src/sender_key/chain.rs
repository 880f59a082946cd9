use crate::Error;
use aes_gcm_siv::aead::{Aead, Payload};
use aes_gcm_siv::{Aes256GcmSiv, Key, KeyInit, Nonce};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

type HmacSha256 = Hmac<Sha256>;

const CHAIN_KEY_SEED: u8 = 0x02;
const CHAIN_KEY_NEXT: u8 = 0x01;
const MESSAGE_KEY_INFO: &[u8] = b"Huddle-SenderKey-Message";

/// Length of the per-message AES-GCM-SIV nonce.
pub const IV_LENGTH: usize = 12;

fn hmac(key: &[u8; 32], input: u8) -> Result<Box<[u8; 32]>, Error> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_slice())
        .map_err(|err| Error::Crypto(err.to_string()))?;
    mac.update(&[input]);

    let mut output = Box::new([0u8; 32]);
    output.copy_from_slice(&mac.finalize().into_bytes());
    Ok(output)
}

/// One link of a sender's symmetric ratchet.
///
/// Derivations are one-way: neither [`next`](Self::next) nor
/// [`message_key`](Self::message_key) reveals the seed it came from.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SenderChainKey {
    iteration: u32,
    seed: Box<[u8; 32]>,
}

impl SenderChainKey {
    pub(crate) fn new(iteration: u32, seed: Box<[u8; 32]>) -> Self {
        Self { iteration, seed }
    }

    /// Iteration this chain key produces the message key for.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub(crate) fn seed(&self) -> &[u8; 32] {
        &self.seed
    }

    /// Derives the chain key for the following iteration.
    pub fn next(&self) -> Result<Self, Error> {
        let iteration = self
            .iteration
            .checked_add(1)
            .ok_or(Error::ChainExhausted(self.iteration))?;

        Ok(Self {
            iteration,
            seed: hmac(&self.seed, CHAIN_KEY_NEXT)?,
        })
    }

    /// Derives the message key for the current iteration without advancing.
    pub fn message_key(&self) -> Result<SenderMessageKey, Error> {
        SenderMessageKey::from_seed(self.iteration, &*self.message_seed()?)
    }

    /// The seed [`message_key`](Self::message_key) expands; what skipped-key buffers keep.
    pub(crate) fn message_seed(&self) -> Result<Zeroizing<[u8; 32]>, Error> {
        let mut seed = hmac(&self.seed, CHAIN_KEY_SEED)?;
        let message_seed = Zeroizing::new(*seed);
        seed.zeroize();
        Ok(message_seed)
    }
}

impl fmt::Debug for SenderChainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderChainKey")
            .field("iteration", &self.iteration)
            .finish_non_exhaustive()
    }
}

/// Key material for exactly one group message.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SenderMessageKey {
    iteration: u32,
    cipher_key: Box<[u8; 32]>,
    iv: [u8; IV_LENGTH],
}

impl SenderMessageKey {
    /// Expands a message-key seed into the cipher key and nonce.
    pub(crate) fn from_seed(iteration: u32, seed: &[u8; 32]) -> Result<Self, Error> {
        let hkdf = Hkdf::<Sha256>::new(None, seed.as_slice());

        let mut okm = [0u8; 32 + IV_LENGTH];
        hkdf.expand(MESSAGE_KEY_INFO, &mut okm)
            .map_err(|err| Error::Crypto(err.to_string()))?;

        let mut cipher_key = Box::new([0u8; 32]);
        cipher_key.copy_from_slice(&okm[..32]);
        let mut iv = [0u8; IV_LENGTH];
        iv.copy_from_slice(&okm[32..]);
        okm.zeroize();

        Ok(Self {
            iteration,
            cipher_key,
            iv,
        })
    }

    /// Iteration this key belongs to.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub(crate) fn encrypt(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>, Error> {
        let cipher = Aes256GcmSiv::new(Key::<Aes256GcmSiv>::from_slice(self.cipher_key.as_slice()));
        Ok(cipher.encrypt(
            Nonce::from_slice(&self.iv),
            Payload {
                msg: plaintext,
                aad,
            },
        )?)
    }

    pub(crate) fn decrypt(&self, ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>, Error> {
        let cipher = Aes256GcmSiv::new(Key::<Aes256GcmSiv>::from_slice(self.cipher_key.as_slice()));
        cipher
            .decrypt(
                Nonce::from_slice(&self.iv),
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|_| Error::InvalidCiphertext)
    }
}

impl fmt::Debug for SenderMessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderMessageKey")
            .field("iteration", &self.iteration)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn chain_key() -> SenderChainKey {
        SenderChainKey::new(0, Box::new([7u8; 32]))
    }

    #[test]
    fn test_next_advances_iteration_and_seed() {
        let first = chain_key();
        let second = first.next().unwrap();
        let third = second.next().unwrap();

        assert_eq!(second.iteration(), 1);
        assert_eq!(third.iteration(), 2);
        assert_ne!(third, first);
        assert_ne!(second.seed(), first.seed());
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = chain_key().next().unwrap().message_key().unwrap();
        let b = chain_key().next().unwrap().message_key().unwrap();

        assert_eq!(a.iteration(), 1);
        assert_eq!(a.cipher_key, b.cipher_key);
        assert_eq!(a.iv, b.iv);
    }

    #[test]
    fn test_message_key_differs_from_next_chain_key() {
        let chain_key = chain_key();
        let message_seed = chain_key.message_seed().unwrap();
        let next = chain_key.next().unwrap();

        assert_ne!(*message_seed, *next.seed());
        assert_ne!(*message_seed, *chain_key.seed());
    }

    #[test]
    fn test_exhausted_chain_fails() {
        let last = SenderChainKey::new(u32::MAX, Box::new([1u8; 32]));
        assert_eq!(last.next(), Err(Error::ChainExhausted(u32::MAX)));
    }

    #[test]
    fn test_message_key_encrypt_decrypt() {
        let message_key = chain_key().message_key().unwrap();
        let ciphertext = message_key.encrypt(b"hello group", b"aad").unwrap();

        assert_eq!(message_key.decrypt(&ciphertext, b"aad").unwrap(), b"hello group");
        assert_eq!(
            message_key.decrypt(&ciphertext, b"other aad"),
            Err(Error::InvalidCiphertext)
        );
    }

    #[test]
    fn test_debug_hides_key_material() {
        let rendered = format!("{:?}", chain_key().message_key().unwrap());
        assert!(rendered.contains("iteration: 0"));
        assert!(!rendered.contains("seed"));
    }

    proptest! {
        #[test]
        fn prop_derived_seeds_never_repeat(start in any::<[u8; 32]>(), steps in 1..128usize) {
            let mut seen = HashSet::new();
            let mut chain_key = SenderChainKey::new(0, Box::new(start));

            for _ in 0..steps {
                prop_assert!(seen.insert(*chain_key.seed()), "chain seed repeated");
                let message_seed = chain_key.message_seed().unwrap();
                prop_assert!(seen.insert(*message_seed), "message seed repeated");
                chain_key = chain_key.next().unwrap();
            }
        }
    }
}
