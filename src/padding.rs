//! Length-prefixed block padding for group plaintexts.
//!
//! Every plaintext is framed as `[len: u16 BE][bytes][zero fill]` and rounded up
//! to a multiple of [`BLOCK_SIZE`], so ciphertext length only reveals which
//! block bucket a message falls into.

use crate::Error;

/// Padding granularity in bytes.
pub const BLOCK_SIZE: usize = 160;

/// Size of the big-endian length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Largest plaintext the prefix can describe.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Pads `message` to the smallest multiple of [`BLOCK_SIZE`] that fits it plus the prefix.
pub fn pad(message: &[u8]) -> Result<Vec<u8>, Error> {
    let length =
        u16::try_from(message.len()).map_err(|_| Error::PayloadTooLarge(message.len()))?;

    let framed_len = message.len() + LENGTH_PREFIX_SIZE;
    let padded_len = framed_len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;

    let mut padded = Vec::with_capacity(padded_len);
    padded.extend_from_slice(&length.to_be_bytes());
    padded.extend_from_slice(message);
    padded.resize(padded_len, 0);

    Ok(padded)
}

/// Strips the framing added by [`pad`], ignoring the trailing fill.
pub fn unpad(padded: &[u8]) -> Result<Vec<u8>, Error> {
    if padded.len() < LENGTH_PREFIX_SIZE {
        return Err(Error::Malformed("Padded payload too short".to_string()));
    }

    let length = usize::from(u16::from_be_bytes([padded[0], padded[1]]));
    let end = LENGTH_PREFIX_SIZE + length;
    if padded.len() < end {
        return Err(Error::Malformed(format!(
            "Length prefix claims {length} bytes but only {} available",
            padded.len() - LENGTH_PREFIX_SIZE
        )));
    }

    Ok(padded[LENGTH_PREFIX_SIZE..end].to_vec())
}
