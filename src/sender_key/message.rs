use crate::Error;
use crate::proto::{SenderKeyDistributionMessageProto, SenderKeyMessageProto};
use ed25519_dalek::{SIGNATURE_LENGTH, Signature, Signer, SigningKey, VerifyingKey};
use prost::Message;
use std::fmt;

/// Version byte leading every sender key message: current and minimum version 3.
pub const SENDER_KEY_VERSION: u8 = 0x33;

fn check_version(bytes: &[u8]) -> Result<&[u8], Error> {
    match bytes.split_first() {
        Some((&SENDER_KEY_VERSION, body)) => Ok(body),
        Some((version, _)) => Err(Error::Malformed(format!(
            "Unsupported sender key version: {version:#04x}"
        ))),
        None => Err(Error::Malformed("Empty sender key message".to_string())),
    }
}

/// A signed group ciphertext.
///
/// Wire layout: `[version][protobuf body][Ed25519 signature]`, where the
/// signature covers the version byte and the body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SenderKeyMessage {
    key_id: u32,
    iteration: u32,
    ciphertext: Vec<u8>,
    serialized: Vec<u8>,
}

impl SenderKeyMessage {
    pub(crate) fn new(
        key_id: u32,
        iteration: u32,
        ciphertext: Vec<u8>,
        signing_key: &SigningKey,
    ) -> Self {
        let proto = SenderKeyMessageProto {
            key_id,
            iteration,
            ciphertext,
        };

        let mut serialized = Vec::with_capacity(1 + proto.encoded_len() + SIGNATURE_LENGTH);
        serialized.push(SENDER_KEY_VERSION);
        serialized.extend_from_slice(&proto.encode_to_vec());

        let signature = signing_key.sign(&serialized);
        serialized.extend_from_slice(&signature.to_bytes());

        Self {
            key_id,
            iteration,
            ciphertext: proto.ciphertext,
            serialized,
        }
    }

    /// Parses a serialized message; the signature is checked separately.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < 1 + SIGNATURE_LENGTH {
            return Err(Error::Malformed(format!(
                "Sender key message too short: {} bytes",
                bytes.len()
            )));
        }

        let signed = &bytes[..bytes.len() - SIGNATURE_LENGTH];
        let proto = SenderKeyMessageProto::decode(check_version(signed)?)?;

        Ok(Self {
            key_id: proto.key_id,
            iteration: proto.iteration,
            ciphertext: proto.ciphertext,
            serialized: bytes.to_vec(),
        })
    }

    /// Checks the trailing signature against the sender's public key.
    pub fn verify_signature(&self, signing_key: &VerifyingKey) -> Result<(), Error> {
        let (signed, signature) = self
            .serialized
            .split_at(self.serialized.len() - SIGNATURE_LENGTH);
        let signature =
            Signature::from_slice(signature).map_err(|_| Error::InvalidSignature)?;

        signing_key
            .verify_strict(signed, &signature)
            .map_err(|_| Error::InvalidSignature)
    }

    /// Key id of the sender state that produced this message.
    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    /// Chain iteration the message was encrypted at.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// The AES-GCM-SIV ciphertext.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// The full signed encoding.
    pub fn serialized(&self) -> &[u8] {
        &self.serialized
    }

    /// Consumes the message, returning its signed encoding.
    pub fn into_bytes(self) -> Vec<u8> {
        self.serialized
    }
}

/// The bootstrap payload that lets a peer verify and decrypt one sender's messages.
///
/// Carries the chain position and public signing key, never the private half.
#[derive(Clone, PartialEq, Eq)]
pub struct SenderKeyDistributionMessage {
    key_id: u32,
    iteration: u32,
    chain_key: Box<[u8; 32]>,
    signing_key: VerifyingKey,
    serialized: Vec<u8>,
}

impl SenderKeyDistributionMessage {
    pub(crate) fn new(
        key_id: u32,
        iteration: u32,
        chain_key: &[u8; 32],
        signing_key: VerifyingKey,
    ) -> Self {
        let proto = SenderKeyDistributionMessageProto {
            key_id,
            iteration,
            chain_key: chain_key.to_vec(),
            signing_key: signing_key.to_bytes().to_vec(),
        };

        let mut serialized = Vec::with_capacity(1 + proto.encoded_len());
        serialized.push(SENDER_KEY_VERSION);
        serialized.extend_from_slice(&proto.encode_to_vec());

        Self {
            key_id,
            iteration,
            chain_key: Box::new(*chain_key),
            signing_key,
            serialized,
        }
    }

    /// Parses and shape-checks a serialized distribution message.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let proto = SenderKeyDistributionMessageProto::decode(check_version(bytes)?)?;

        let chain_key: [u8; 32] = proto.chain_key.as_slice().try_into().map_err(|_| {
            Error::Malformed(format!(
                "Invalid chain key length: {}",
                proto.chain_key.len()
            ))
        })?;
        let signing_key: [u8; 32] =
            proto.signing_key.as_slice().try_into().map_err(|_| {
                Error::Malformed(format!(
                    "Invalid signing key length: {}",
                    proto.signing_key.len()
                ))
            })?;
        let signing_key = VerifyingKey::from_bytes(&signing_key)
            .map_err(|err| Error::Malformed(err.to_string()))?;

        Ok(Self {
            key_id: proto.key_id,
            iteration: proto.iteration,
            chain_key: Box::new(chain_key),
            signing_key,
            serialized: bytes.to_vec(),
        })
    }

    /// Key id of the distributed state.
    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    /// Chain iteration the receiver starts at.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub(crate) fn chain_key(&self) -> &[u8; 32] {
        &self.chain_key
    }

    /// Public key that verifies the sender's messages.
    pub fn signing_key(&self) -> &VerifyingKey {
        &self.signing_key
    }

    /// The encoded message.
    pub fn serialized(&self) -> &[u8] {
        &self.serialized
    }
}

impl fmt::Debug for SenderKeyDistributionMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderKeyDistributionMessage")
            .field("key_id", &self.key_id)
            .field("iteration", &self.iteration)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[9u8; 32])
    }

    #[test]
    fn test_message_layout() {
        let message = SenderKeyMessage::new(77, 3, b"ciphertext".to_vec(), &signing_key());
        let bytes = message.serialized();

        assert_eq!(bytes[0], SENDER_KEY_VERSION);
        let body = &bytes[1..bytes.len() - SIGNATURE_LENGTH];
        let proto = SenderKeyMessageProto::decode(body).unwrap();
        assert_eq!(proto.key_id, 77);
        assert_eq!(proto.iteration, 3);
        assert_eq!(proto.ciphertext, b"ciphertext");
    }

    #[test]
    fn test_message_parses_and_verifies() {
        let key = signing_key();
        let message = SenderKeyMessage::new(77, 3, b"ciphertext".to_vec(), &key);
        let parsed = SenderKeyMessage::deserialize(message.serialized()).unwrap();

        assert_eq!(parsed, message);
        assert!(parsed.verify_signature(&key.verifying_key()).is_ok());

        let other = SigningKey::from_bytes(&[10u8; 32]).verifying_key();
        assert_eq!(
            parsed.verify_signature(&other),
            Err(Error::InvalidSignature)
        );
    }

    #[test]
    fn test_flipped_body_bit_breaks_signature() {
        let key = signing_key();
        let mut bytes = SenderKeyMessage::new(1, 0, vec![0xAA; 16], &key).into_bytes();
        let last_ciphertext_byte = bytes.len() - SIGNATURE_LENGTH - 1;
        bytes[last_ciphertext_byte] ^= 0x01;

        let parsed = SenderKeyMessage::deserialize(&bytes).unwrap();
        assert_eq!(
            parsed.verify_signature(&key.verifying_key()),
            Err(Error::InvalidSignature)
        );
    }

    #[test]
    fn test_short_or_unversioned_message_is_malformed() {
        assert!(matches!(
            SenderKeyMessage::deserialize(&[SENDER_KEY_VERSION; 10]),
            Err(Error::Malformed(_))
        ));

        let mut bytes = SenderKeyMessage::new(1, 0, vec![1, 2, 3], &signing_key()).into_bytes();
        bytes[0] = 0x22;
        assert!(matches!(
            SenderKeyMessage::deserialize(&bytes),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn test_distribution_carries_public_material_only() {
        let key = signing_key();
        let distribution = SenderKeyDistributionMessage::new(5, 12, &[3u8; 32], key.verifying_key());
        let parsed = SenderKeyDistributionMessage::deserialize(distribution.serialized()).unwrap();

        assert_eq!(parsed.key_id(), 5);
        assert_eq!(parsed.iteration(), 12);
        assert_eq!(parsed.chain_key(), &[3u8; 32]);
        assert_eq!(parsed.signing_key(), &key.verifying_key());

        let proto = SenderKeyDistributionMessageProto::decode(&distribution.serialized()[1..]).unwrap();
        assert_eq!(proto.signing_key, key.verifying_key().to_bytes());
    }

    #[test]
    fn test_distribution_with_short_chain_key_is_malformed() {
        let proto = SenderKeyDistributionMessageProto {
            key_id: 1,
            iteration: 0,
            chain_key: vec![0u8; 16],
            signing_key: signing_key().verifying_key().to_bytes().to_vec(),
        };
        let mut bytes = vec![SENDER_KEY_VERSION];
        bytes.extend_from_slice(&proto.encode_to_vec());

        assert!(matches!(
            SenderKeyDistributionMessage::deserialize(&bytes),
            Err(Error::Malformed(_))
        ));
        assert!(matches!(
            SenderKeyDistributionMessage::deserialize(&[]),
            Err(Error::Malformed(_))
        ));
    }
}
