//! Content fingerprinting for deduplication.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of a digest in hex characters.
pub const DIGEST_HEX_LEN: usize = 64;

/// Lowercase hex SHA-256 of a decoded document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Digest of the exact UTF-8 bytes of `content`. No normalization.
    pub fn of(content: &str) -> Self {
        Self(hex::encode(Sha256::digest(content.as_bytes())))
    }

    /// Wrap a digest read back from storage.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 16 characters, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..16).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        let digest = ContentDigest::of("Hello");
        assert_eq!(
            digest.as_str(),
            "185f8db32271fe25f561a6fc938b2e264306ec304eda518007d1764826381969"
        );
        assert_eq!(digest.as_str().len(), DIGEST_HEX_LEN);
        assert_eq!(digest.short(), "185f8db32271fe25");
    }

    #[test]
    fn test_single_byte_change() {
        assert_eq!(ContentDigest::of("Hello"), ContentDigest::of("Hello"));
        assert_ne!(ContentDigest::of("Hello"), ContentDigest::of("Hellp"));
        assert_ne!(ContentDigest::of("Hello"), ContentDigest::of("Hello "));
    }
}
