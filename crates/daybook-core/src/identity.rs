//! Content identity for whole files and single blocks.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::{fmt, num::ParseIntError, str::FromStr};

/// Whole-file identity compared by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIdentity {
    /// File length in bytes.
    pub size_bytes: u64,
    /// Lower-case hex SHA-256 of the file bytes.
    pub sha256: String,
}

impl FileIdentity {
    /// Identity of raw file contents.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self {
            size_bytes: bytes.len() as u64,
            sha256: hex::encode(Sha256::digest(bytes)),
        }
    }

    /// Whether a stored `(size, hash)` pair describes the same bytes.
    #[must_use]
    pub fn matches(&self, size_bytes: u64, sha256: &str) -> bool {
        self.size_bytes == size_bytes && self.sha256 == sha256
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Content hash of one block (FNV-1a 64 over the raw block text).
///
/// Rendered as lower-case hex without leading zeros.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct BlockHash(pub u64);

impl BlockHash {
    /// Hash the exact raw block text (no normalization).
    #[must_use]
    pub const fn of(raw_block: &str) -> Self {
        let bytes = raw_block.as_bytes();
        let mut hash = FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl FromStr for BlockHash {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s.trim(), 16).map(Self)
    }
}

impl Serialize for BlockHash {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
