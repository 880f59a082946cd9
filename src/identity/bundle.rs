use super::IDENTITY_PUBLIC_LENGTH;
use crate::{Error, IdentityKey, OneTimePreKey, SignedPreKey, X25519PublicKey};
use ed25519_dalek::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};

/// Public key material a member publishes so peers can open a pairwise session.
///
/// Field names and the base64 encoding of key fields match what the
/// membership service stores and hands back from its directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreKeyBundle {
    /// Registration id of the publishing member.
    pub registration_id: u32,
    /// X25519 identity key followed by the Ed25519 verifying key.
    #[serde(with = "crate::serde_base64")]
    pub identity: Vec<u8>,
    /// Public signed pre-key.
    #[serde(with = "crate::serde_base64")]
    pub signed_prekey: Vec<u8>,
    /// Ed25519 signature over `signed_prekey` by the identity.
    #[serde(with = "crate::serde_base64")]
    pub signed_prekey_sig: Vec<u8>,
    /// Public one-time pre-key.
    #[serde(with = "crate::serde_base64")]
    pub one_time_prekey: Vec<u8>,
}

impl PreKeyBundle {
    /// Assembles the bundle for a local identity.
    pub fn new(
        registration_id: u32,
        identity_key: &IdentityKey,
        signed_pre_key: &SignedPreKey,
        one_time_pre_key: &OneTimePreKey,
    ) -> Self {
        Self {
            registration_id,
            identity: identity_key.public_bytes().to_vec(),
            signed_prekey: signed_pre_key.public_key().as_bytes().to_vec(),
            signed_prekey_sig: signed_pre_key.signature(identity_key).to_bytes().to_vec(),
            one_time_prekey: one_time_pre_key.public_key().as_bytes().to_vec(),
        }
    }

    /// The X25519 half of the published identity.
    pub fn identity_dh_key(&self) -> Result<X25519PublicKey, Error> {
        Ok(X25519PublicKey::from(self.identity_half(0)?))
    }

    /// The Ed25519 half of the published identity.
    pub fn identity_signing_key(&self) -> Result<VerifyingKey, Error> {
        VerifyingKey::from_bytes(&self.identity_half(32)?)
            .map_err(|err| Error::PreKey(err.to_string()))
    }

    /// The public signed pre-key.
    pub fn signed_prekey_public(&self) -> Result<X25519PublicKey, Error> {
        Ok(X25519PublicKey::from(key_bytes(&self.signed_prekey, "signed pre-key")?))
    }

    /// The public one-time pre-key.
    pub fn one_time_prekey_public(&self) -> Result<X25519PublicKey, Error> {
        Ok(X25519PublicKey::from(key_bytes(
            &self.one_time_prekey,
            "one-time pre-key",
        )?))
    }

    /// Verifies the bundle's signature to ensure authenticity.
    ///
    /// This confirms that the signed pre-key was created by the owner of the
    /// identity key, and that every key field has the right length.
    pub fn verify(&self) -> Result<(), Error> {
        let signing_key = self.identity_signing_key()?;
        let signed_prekey = self.signed_prekey_public()?;
        self.one_time_prekey_public()?;

        let signature = Signature::from_slice(&self.signed_prekey_sig)
            .map_err(|err| Error::PreKey(err.to_string()))?;

        signing_key
            .verify_strict(signed_prekey.as_bytes(), &signature)
            .map_err(|err| Error::PreKey(err.to_string()))
    }

    fn identity_half(&self, offset: usize) -> Result<[u8; 32], Error> {
        if self.identity.len() != IDENTITY_PUBLIC_LENGTH {
            return Err(Error::PreKey(format!(
                "Identity must be {IDENTITY_PUBLIC_LENGTH} bytes, got {}",
                self.identity.len()
            )));
        }
        key_bytes(&self.identity[offset..offset + 32], "identity")
    }
}

fn key_bytes(bytes: &[u8], what: &str) -> Result<[u8; 32], Error> {
    bytes
        .try_into()
        .map_err(|_| Error::PreKey(format!("Invalid {what} length: {}", bytes.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ONE_TIME_PRE_KEY_ID, SIGNED_PRE_KEY_ID};

    fn make_bundle() -> (IdentityKey, PreKeyBundle) {
        let identity_key = IdentityKey::new().unwrap();
        let spk = SignedPreKey::new(SIGNED_PRE_KEY_ID).unwrap();
        let otpk = OneTimePreKey::new(ONE_TIME_PRE_KEY_ID).unwrap();
        let bundle = PreKeyBundle::new(4242, &identity_key, &spk, &otpk);
        (identity_key, bundle)
    }

    #[test]
    fn test_bundle_verifies() {
        let (identity_key, bundle) = make_bundle();
        assert!(bundle.verify().is_ok());
        assert_eq!(bundle.identity_dh_key().unwrap(), identity_key.dh_key_public());
        assert_eq!(
            bundle.identity_signing_key().unwrap(),
            identity_key.signing_key_public()
        );
    }

    #[test]
    fn test_tampered_signed_prekey_is_rejected() {
        let (_, mut bundle) = make_bundle();
        bundle.signed_prekey[0] ^= 0x01;
        assert!(matches!(bundle.verify(), Err(Error::PreKey(_))));
    }

    #[test]
    fn test_signature_from_other_identity_is_rejected() {
        let (_, mut bundle) = make_bundle();
        let (_, other) = make_bundle();
        bundle.signed_prekey_sig = other.signed_prekey_sig;
        assert!(matches!(bundle.verify(), Err(Error::PreKey(_))));
    }

    #[test]
    fn test_short_identity_is_rejected() {
        let (_, mut bundle) = make_bundle();
        bundle.identity.truncate(32);
        assert!(matches!(bundle.verify(), Err(Error::PreKey(_))));
    }

    #[test]
    fn test_json_uses_directory_field_names() {
        let (_, bundle) = make_bundle();
        let json = serde_json::to_value(&bundle).unwrap();

        assert_eq!(json["registration_id"], 4242);
        for field in [
            "identity",
            "signed_prekey",
            "signed_prekey_sig",
            "one_time_prekey",
        ] {
            assert!(json[field].is_string(), "{field} should be base64");
        }

        let decoded: PreKeyBundle = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, bundle);
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let json = r#"{"registration_id":1,"identity":"!!","signed_prekey":"","signed_prekey_sig":"","one_time_prekey":""}"#;
        assert!(serde_json::from_str::<PreKeyBundle>(json).is_err());
    }
}
