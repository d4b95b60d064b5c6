//! Content hashes used to compare compiled resources across generations.
//!
//! Uses BLAKE3 over the canonical `postcard` encoding of a value.

use crate::error::CoreResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A BLAKE3 content hash (256 bits / 32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Compute BLAKE3 hash of raw bytes
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hash the canonical encoding of a serializable value
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be encoded
    pub fn of<T: Serialize + ?Sized>(value: &T) -> CoreResult<Self> {
        let bytes = postcard::to_allocvec(value)?;
        Ok(Self::compute(&bytes))
    }

    /// Convert to hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short form used in log lines
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
