//! Local identity setup: the key material a member publishes when joining.

use crate::identity::generate_random_id;
use crate::{
    Error, IdentityKey, KeyStore, ONE_TIME_PRE_KEY_ID, OneTimePreKey, PreKeyBundle,
    SIGNED_PRE_KEY_ID, SignedPreKey,
};

/// Generates a fresh identity, stores it, and returns the bundle to publish.
///
/// Creates the identity key, a registration id, the signed pre-key and the
/// single one-time pre-key, replacing whatever the store held before.
pub fn generate<S: KeyStore + ?Sized>(store: &mut S) -> Result<PreKeyBundle, Error> {
    let identity_key = IdentityKey::new()?;
    let registration_id = generate_random_id()?;
    let signed_pre_key = SignedPreKey::new(SIGNED_PRE_KEY_ID)?;
    let one_time_pre_key = OneTimePreKey::new(ONE_TIME_PRE_KEY_ID)?;

    store.store_identity_key(&identity_key)?;
    store.store_registration_id(registration_id)?;
    store.store_signed_pre_key(&signed_pre_key)?;
    store.store_pre_key(&one_time_pre_key)?;

    tracing::debug!(registration_id, "Generated identity material");

    Ok(PreKeyBundle::new(
        registration_id,
        &identity_key,
        &signed_pre_key,
        &one_time_pre_key,
    ))
}

/// Rebuilds the publishable bundle from what the store holds.
pub fn prekey_bundle<S: KeyStore + ?Sized>(store: &S) -> Result<PreKeyBundle, Error> {
    let identity_key = store
        .load_identity_key()?
        .ok_or_else(|| Error::PreKey("No identity key".to_string()))?;
    let registration_id = store
        .load_registration_id()?
        .ok_or_else(|| Error::PreKey("No registration id".to_string()))?;
    let signed_pre_key = store
        .load_signed_pre_key(SIGNED_PRE_KEY_ID)?
        .ok_or_else(|| Error::PreKey(format!("No signed pre-key {SIGNED_PRE_KEY_ID}")))?;
    let one_time_pre_key = store
        .load_pre_key(ONE_TIME_PRE_KEY_ID)?
        .ok_or_else(|| Error::PreKey(format!("No one-time pre-key {ONE_TIME_PRE_KEY_ID}")))?;

    Ok(PreKeyBundle::new(
        registration_id,
        &identity_key,
        &signed_pre_key,
        &one_time_pre_key,
    ))
}
