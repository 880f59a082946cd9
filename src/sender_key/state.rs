use super::{SenderChainKey, SenderMessageKey};
use crate::identity::{generate_random_id, generate_random_seed};
use crate::proto::{
    SenderChainKeyProto, SenderKeyStateProto, SenderMessageKeyProto, SenderSigningKeyProto,
};
use crate::{Error, GroupConfig};
use ed25519_dalek::{SecretKey, SigningKey, VerifyingKey};
use std::collections::BTreeMap;
use zeroize::Zeroizing;

/// One epoch of a sender's ratchet, identified by its key id.
///
/// The private signing key is only present in the originating sender's copy.
#[derive(Clone)]
pub struct SenderKeyState {
    key_id: u32,
    chain_key: SenderChainKey,
    signing_key_public: VerifyingKey,
    signing_key_private: Option<Box<SigningKey>>,
    // Seeds only; cipher keys are expanded when a buffered iteration arrives
    message_keys: BTreeMap<u32, Zeroizing<[u8; 32]>>,
}

impl SenderKeyState {
    pub(crate) fn new(
        key_id: u32,
        chain_key: SenderChainKey,
        signing_key_public: VerifyingKey,
        signing_key_private: Option<Box<SigningKey>>,
    ) -> Self {
        Self {
            key_id,
            chain_key,
            signing_key_public,
            signing_key_private,
            message_keys: BTreeMap::new(),
        }
    }

    /// Originates a fresh state: random key id, iteration 0, new seed and signing key.
    pub(crate) fn generate() -> Result<Self, Error> {
        let key_id = generate_random_id()?;
        let chain_key = SenderChainKey::new(0, generate_random_seed()?);

        let signing_seed = generate_random_seed()?;
        let signing_key = Box::new(SigningKey::from(SecretKey::from(*signing_seed)));

        Ok(Self::new(
            key_id,
            chain_key,
            signing_key.verifying_key(),
            Some(signing_key),
        ))
    }

    /// The key id carried by every message of this epoch.
    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    /// The chain key for the next unused iteration.
    pub fn chain_key(&self) -> &SenderChainKey {
        &self.chain_key
    }

    /// Key that verifies this sender's messages.
    pub fn signing_key_public(&self) -> &VerifyingKey {
        &self.signing_key_public
    }

    pub(crate) fn signing_key_private(&self) -> Option<&SigningKey> {
        self.signing_key_private.as_deref()
    }

    /// Whether this is the originating sender's own state.
    pub fn has_signing_key_private(&self) -> bool {
        self.signing_key_private.is_some()
    }

    /// Number of skipped message keys waiting for out-of-order messages.
    pub fn message_key_count(&self) -> usize {
        self.message_keys.len()
    }

    /// Whether a skipped key for `iteration` is buffered.
    pub fn has_message_key(&self, iteration: u32) -> bool {
        self.message_keys.contains_key(&iteration)
    }

    pub(crate) fn set_chain_key(&mut self, chain_key: SenderChainKey) {
        self.chain_key = chain_key;
    }

    /// Buffers a skipped key, evicting the lowest iterations beyond `max_message_keys`.
    fn add_message_key(
        &mut self,
        iteration: u32,
        seed: Zeroizing<[u8; 32]>,
        max_message_keys: usize,
    ) {
        self.message_keys.insert(iteration, seed);
        while self.message_keys.len() > max_message_keys {
            self.message_keys.pop_first();
        }
    }

    /// Returns the message key for `iteration`, moving the chain forward as needed.
    ///
    /// Past iterations are served from the skipped-key buffer exactly once.
    /// Intermediate keys between the chain and `iteration` are buffered.
    pub(crate) fn resolve_message_key(
        &mut self,
        iteration: u32,
        config: &GroupConfig,
    ) -> Result<SenderMessageKey, Error> {
        let current = self.chain_key.iteration();

        if current > iteration {
            let seed = self
                .message_keys
                .remove(&iteration)
                .ok_or(Error::DuplicateMessage { iteration, current })?;
            return SenderMessageKey::from_seed(iteration, &seed);
        }

        if iteration - current > config.max_future_messages {
            return Err(Error::FutureMessage { iteration, current });
        }

        let mut chain_key = self.chain_key.clone();
        while chain_key.iteration() < iteration {
            self.add_message_key(
                chain_key.iteration(),
                chain_key.message_seed()?,
                config.max_message_keys,
            );
            chain_key = chain_key.next()?;
        }

        if iteration > current {
            tracing::debug!(
                key_id = self.key_id,
                skipped = iteration - current,
                "Buffered skipped sender message keys"
            );
        }

        let message_key = chain_key.message_key()?;
        self.chain_key = chain_key.next()?;

        Ok(message_key)
    }

    pub(crate) fn to_proto(&self) -> SenderKeyStateProto {
        SenderKeyStateProto {
            key_id: self.key_id,
            chain_key: Some(SenderChainKeyProto {
                iteration: self.chain_key.iteration(),
                seed: self.chain_key.seed().to_vec(),
            }),
            signing_key: Some(SenderSigningKeyProto {
                public_key: self.signing_key_public.to_bytes().to_vec(),
                private_key: self
                    .signing_key_private
                    .as_ref()
                    .map(|key| key.to_bytes().to_vec()),
            }),
            message_keys: self
                .message_keys
                .iter()
                .map(|(&iteration, seed)| SenderMessageKeyProto {
                    iteration,
                    seed: seed.to_vec(),
                })
                .collect(),
        }
    }

    pub(crate) fn from_proto(proto: SenderKeyStateProto) -> Result<Self, Error> {
        let chain_key_proto = proto
            .chain_key
            .ok_or_else(|| Error::Serde("Sender key state without chain key".to_string()))?;
        let chain_key = SenderChainKey::new(
            chain_key_proto.iteration,
            seed_from_slice(&chain_key_proto.seed)?,
        );

        let signing_key_proto = proto
            .signing_key
            .ok_or_else(|| Error::Serde("Sender key state without signing key".to_string()))?;
        let signing_key_public = VerifyingKey::from_bytes(&*seed_from_slice(
            &signing_key_proto.public_key,
        )?)
        .map_err(|err| Error::Serde(err.to_string()))?;
        let signing_key_private = signing_key_proto
            .private_key
            .map(|bytes| {
                seed_from_slice(&bytes).map(|secret| Box::new(SigningKey::from_bytes(&secret)))
            })
            .transpose()?;

        let mut state = Self::new(
            proto.key_id,
            chain_key,
            signing_key_public,
            signing_key_private,
        );
        for message_key in proto.message_keys {
            state.message_keys.insert(
                message_key.iteration,
                Zeroizing::new(*seed_from_slice(&message_key.seed)?),
            );
        }

        Ok(state)
    }
}

fn seed_from_slice(bytes: &[u8]) -> Result<Box<[u8; 32]>, Error> {
    let mut seed = Box::new([0u8; 32]);
    if bytes.len() != seed.len() {
        return Err(Error::Serde(format!(
            "Expected 32 bytes of key material, got {}",
            bytes.len()
        )));
    }
    seed.copy_from_slice(bytes);
    Ok(seed)
}
