use super::{SenderKeyMessage, SenderKeyName};
use crate::{Error, GroupConfig, KeyStore};

fn associated_data(key_id: u32, iteration: u32) -> [u8; 8] {
    let mut aad = [0u8; 8];
    aad[..4].copy_from_slice(&key_id.to_be_bytes());
    aad[4..].copy_from_slice(&iteration.to_be_bytes());
    aad
}

/// Encrypts and decrypts group messages for one [`SenderKeyName`].
///
/// Holding the store by `&mut` serializes every read-modify-write of the
/// record. The record is persisted only after a call fully succeeds, so a
/// rejected message never leaves a trace in the store.
pub struct GroupCipher<'a, S: KeyStore + ?Sized> {
    store: &'a mut S,
    name: SenderKeyName,
    config: GroupConfig,
}

impl<'a, S: KeyStore + ?Sized> GroupCipher<'a, S> {
    /// Creates a cipher with the default bounds.
    pub fn new(store: &'a mut S, name: SenderKeyName) -> Self {
        Self::with_config(store, name, GroupConfig::default())
    }

    /// Creates a cipher with custom bounds.
    pub fn with_config(store: &'a mut S, name: SenderKeyName, config: GroupConfig) -> Self {
        Self {
            store,
            name,
            config,
        }
    }

    /// Encrypts an already padded plaintext with this identity's sending state.
    ///
    /// Each call consumes exactly one chain iteration.
    pub fn encrypt(&mut self, padded_plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let mut record = self.store.load_sender_key(&self.name)?;
        let state = record
            .sending_state_mut()
            .ok_or_else(|| Error::NoSession(self.name.to_string()))?;
        let signing_key = state
            .signing_key_private()
            .ok_or_else(|| Error::NoSession(self.name.to_string()))?;

        let key_id = state.key_id();
        let chain_key = state.chain_key();
        let iteration = chain_key.iteration();

        let message_key = chain_key.message_key()?;
        let ciphertext =
            message_key.encrypt(padded_plaintext, &associated_data(key_id, iteration))?;
        let message = SenderKeyMessage::new(key_id, iteration, ciphertext, signing_key);

        let next = chain_key.next()?;
        state.set_chain_key(next);
        self.store.store_sender_key(&self.name, &record)?;

        tracing::debug!(name = %self.name, key_id, iteration, "Encrypted group message");

        Ok(message.into_bytes())
    }

    /// Verifies and decrypts a serialized group message.
    pub fn decrypt(&mut self, serialized: &[u8]) -> Result<Vec<u8>, Error> {
        let mut record = self.store.load_sender_key(&self.name)?;
        if record.is_empty() {
            return Err(Error::NoSession(self.name.to_string()));
        }

        let message = SenderKeyMessage::deserialize(serialized)?;
        let state = record
            .state_mut(message.key_id())
            .ok_or(Error::UnknownKeyId(message.key_id()))?;
        message.verify_signature(state.signing_key_public())?;

        let message_key = state.resolve_message_key(message.iteration(), &self.config)?;
        let plaintext = message_key.decrypt(
            message.ciphertext(),
            &associated_data(message.key_id(), message.iteration()),
        )?;

        self.store.store_sender_key(&self.name, &record)?;

        tracing::debug!(
            name = %self.name,
            key_id = message.key_id(),
            iteration = message.iteration(),
            "Decrypted group message"
        );

        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DEFAULT_DEVICE_INDEX, GroupSessionBuilder, MemoryKeyStore, SenderChainKey,
        SenderKeyDistributionMessage,
    };

    fn name() -> SenderKeyName {
        SenderKeyName::new("group", "alice", DEFAULT_DEVICE_INDEX)
    }

    fn setup() -> (MemoryKeyStore, MemoryKeyStore) {
        let mut alice = MemoryKeyStore::new();
        let mut bob = MemoryKeyStore::new();

        let distribution = GroupSessionBuilder::new(&mut alice).create(&name()).unwrap();
        let distribution = SenderKeyDistributionMessage::deserialize(distribution.serialized()).unwrap();
        GroupSessionBuilder::new(&mut bob)
            .process(&name(), &distribution)
            .unwrap();

        (alice, bob)
    }

    #[test]
    fn test_encrypt_without_sending_state_fails() {
        let mut store = MemoryKeyStore::new();
        let mut cipher = GroupCipher::new(&mut store, name());

        assert_eq!(
            cipher.encrypt(b"hello"),
            Err(Error::NoSession("group::alice::1".to_string()))
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_receiver_cannot_encrypt_as_sender() {
        let (_, mut bob) = setup();
        let mut cipher = GroupCipher::new(&mut bob, name());
        assert!(matches!(cipher.encrypt(b"forged"), Err(Error::NoSession(_))));
    }

    #[test]
    fn test_decrypt_without_record_fails() {
        let (mut alice, _) = setup();
        let ciphertext = GroupCipher::new(&mut alice, name()).encrypt(b"hi").unwrap();

        let mut carol = MemoryKeyStore::new();
        assert!(matches!(
            GroupCipher::new(&mut carol, name()).decrypt(&ciphertext),
            Err(Error::NoSession(_))
        ));
    }

    #[test]
    fn test_sequential_messages() {
        let (mut alice, mut bob) = setup();

        for i in 0..10u8 {
            let plaintext = vec![i; 20];
            let ciphertext = GroupCipher::new(&mut alice, name()).encrypt(&plaintext).unwrap();
            let decrypted = GroupCipher::new(&mut bob, name()).decrypt(&ciphertext).unwrap();
            assert_eq!(decrypted, plaintext);
        }

        let record = alice.load_sender_key(&name()).unwrap();
        assert_eq!(record.sending_state().unwrap().chain_key().iteration(), 10);
    }

    #[test]
    fn test_encrypt_advances_chain_once() {
        let (mut alice, _) = setup();
        let first = GroupCipher::new(&mut alice, name()).encrypt(b"same").unwrap();
        let second = GroupCipher::new(&mut alice, name()).encrypt(b"same").unwrap();

        assert_ne!(first, second);
        assert_eq!(SenderKeyMessage::deserialize(&first).unwrap().iteration(), 0);
        assert_eq!(SenderKeyMessage::deserialize(&second).unwrap().iteration(), 1);
    }

    #[test]
    fn test_out_of_order_delivery() {
        let (mut alice, mut bob) = setup();
        let messages: Vec<_> = (0..3u8)
            .map(|i| GroupCipher::new(&mut alice, name()).encrypt(&[i]).unwrap())
            .collect();

        let mut cipher = GroupCipher::new(&mut bob, name());
        assert_eq!(cipher.decrypt(&messages[2]).unwrap(), [2]);
        assert_eq!(cipher.decrypt(&messages[0]).unwrap(), [0]);
        assert_eq!(cipher.decrypt(&messages[1]).unwrap(), [1]);
    }

    #[test]
    fn test_replay_is_rejected() {
        let (mut alice, mut bob) = setup();
        let ciphertext = GroupCipher::new(&mut alice, name()).encrypt(b"once").unwrap();

        let mut cipher = GroupCipher::new(&mut bob, name());
        assert_eq!(cipher.decrypt(&ciphertext).unwrap(), b"once");
        assert_eq!(
            cipher.decrypt(&ciphertext),
            Err(Error::DuplicateMessage {
                iteration: 0,
                current: 1
            })
        );
    }

    #[test]
    fn test_tampered_message_is_rejected_and_not_persisted() {
        let (mut alice, mut bob) = setup();
        let ciphertext = GroupCipher::new(&mut alice, name()).encrypt(b"payload").unwrap();
        let before = bob.load_sender_key(&name()).unwrap().serialize();

        let mut bad_signature = ciphertext.clone();
        let last = bad_signature.len() - 1;
        bad_signature[last] ^= 0x01;

        let mut bad_ciphertext = ciphertext.clone();
        let index = bad_ciphertext.len() - 65;
        bad_ciphertext[index] ^= 0x01;

        let mut cipher = GroupCipher::new(&mut bob, name());
        assert_eq!(cipher.decrypt(&bad_signature), Err(Error::InvalidSignature));
        assert_eq!(cipher.decrypt(&bad_ciphertext), Err(Error::InvalidSignature));

        assert_eq!(bob.load_sender_key(&name()).unwrap().serialize(), before);
        assert_eq!(
            GroupCipher::new(&mut bob, name()).decrypt(&ciphertext).unwrap(),
            b"payload"
        );
    }

    #[test]
    fn test_signed_garbage_fails_authentication() {
        let (alice, mut bob) = setup();
        let record = alice.load_sender_key(&name()).unwrap();
        let state = record.sending_state().unwrap();
        let forged = SenderKeyMessage::new(
            state.key_id(),
            0,
            vec![0u8; 176],
            state.signing_key_private().unwrap(),
        );
        let before = bob.load_sender_key(&name()).unwrap().serialize();

        let result = GroupCipher::new(&mut bob, name()).decrypt(forged.serialized());
        assert_eq!(result, Err(Error::InvalidCiphertext));
        assert_eq!(bob.load_sender_key(&name()).unwrap().serialize(), before);
    }

    #[test]
    fn test_exhausted_sender_chain_is_rejected() {
        let mut alice = MemoryKeyStore::new();
        let mut bob = MemoryKeyStore::new();
        let distribution = GroupSessionBuilder::new(&mut alice).create(&name()).unwrap();

        let record = alice.load_sender_key(&name()).unwrap();
        let state = record.sending_state().unwrap();
        let last = SenderKeyDistributionMessage::new(
            state.key_id(),
            u32::MAX,
            &[9u8; 32],
            *distribution.signing_key(),
        );
        GroupSessionBuilder::new(&mut bob).process(&name(), &last).unwrap();

        let final_key = SenderChainKey::new(u32::MAX, Box::new([9u8; 32]))
            .message_key()
            .unwrap();
        let ciphertext = final_key
            .encrypt(b"last", &associated_data(state.key_id(), u32::MAX))
            .unwrap();
        let message = SenderKeyMessage::new(
            state.key_id(),
            u32::MAX,
            ciphertext,
            state.signing_key_private().unwrap(),
        );

        assert_eq!(
            GroupCipher::new(&mut bob, name()).decrypt(message.serialized()),
            Err(Error::ChainExhausted(u32::MAX))
        );
    }

    #[test]
    fn test_unknown_key_id_is_rejected() {
        let (_, mut bob) = setup();

        let mut mallory = MemoryKeyStore::new();
        GroupSessionBuilder::new(&mut mallory).create(&name()).unwrap();
        let ciphertext = GroupCipher::new(&mut mallory, name()).encrypt(b"hi").unwrap();
        let key_id = SenderKeyMessage::deserialize(&ciphertext).unwrap().key_id();

        assert_eq!(
            GroupCipher::new(&mut bob, name()).decrypt(&ciphertext),
            Err(Error::UnknownKeyId(key_id))
        );
    }

    #[test]
    fn test_malformed_message_is_rejected() {
        let (_, mut bob) = setup();
        assert!(matches!(
            GroupCipher::new(&mut bob, name()).decrypt(b"garbage"),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn test_future_bound_is_configurable() {
        let (mut alice, mut bob) = setup();
        let config = GroupConfig {
            max_future_messages: 3,
            ..GroupConfig::default()
        };

        let messages: Vec<_> = (0..5u8)
            .map(|i| GroupCipher::new(&mut alice, name()).encrypt(&[i]).unwrap())
            .collect();

        let mut cipher = GroupCipher::with_config(&mut bob, name(), config);
        assert_eq!(
            cipher.decrypt(&messages[4]),
            Err(Error::FutureMessage {
                iteration: 4,
                current: 0
            })
        );
        assert_eq!(cipher.decrypt(&messages[3]).unwrap(), [3]);
        assert_eq!(cipher.decrypt(&messages[4]).unwrap(), [4]);
    }
}
