mod bundle;
pub use bundle::*;
mod identity_key;
pub use identity_key::*;
mod one_time_pre_key;
pub use one_time_pre_key::*;
mod pre_key;
pub use pre_key::*;

use crate::Error;
use rand::TryRngCore;
use rand::rngs::OsRng;

/// Generates a cryptographically secure random 32-byte seed.
pub(crate) fn generate_random_seed() -> Result<Box<[u8; 32]>, Error> {
    let mut seed = Box::new([0u8; 32]);
    OsRng
        .try_fill_bytes(seed.as_mut_slice())
        .map_err(|_| Error::Random)?;
    Ok(seed)
}

/// Generates a random non-zero 31-bit identifier.
///
/// Used for registration ids and sender key ids.
pub(crate) fn generate_random_id() -> Result<u32, Error> {
    loop {
        let id = OsRng.try_next_u32().map_err(|_| Error::Random)? & 0x7FFF_FFFF;
        if id != 0 {
            return Ok(id);
        }
    }
}
