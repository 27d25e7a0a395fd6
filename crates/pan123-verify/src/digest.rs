use std::fmt;
use std::str::FromStr;

use crate::{Result, VerificationError};

/// Length in bytes of a [`ContentDigest`].
pub const DIGEST_LEN: usize = 16;

/// Checksum of an entire upload source.
///
/// Serialized on the wire as 32 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; DIGEST_LEN]);

impl ContentDigest {
    pub const fn from_array(bytes: [u8; DIGEST_LEN]) -> Self { Self(bytes) }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; DIGEST_LEN] =
            bytes.try_into().map_err(|_| VerificationError::InvalidLength {
                expected: DIGEST_LEN,
                actual:   bytes.len(),
            })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] { &self.0 }

    pub fn to_hex(&self) -> String { hex::encode(self.0) }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.to_hex()) }
}

impl FromStr for ContentDigest {
    type Err = VerificationError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())?;
        Self::from_slice(&bytes)
    }
}
