//! Fixed-width identifiers shared by the ring, the block store and the log.
//!
//! Keys, block contents and vnode labels all collapse to a [`HashId`]. Ring
//! positions are compared bytewise, so `HashId`'s `Ord` is the ring order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of a [`HashId`] in bytes.
pub const HASH_LEN: usize = 32;

/// A 32-byte identifier: a key hash, a content hash or a vnode id.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HashId(pub [u8; HASH_LEN]);

impl HashId {
    /// The all-zero id. Used as the `previous` link of the first log entry.
    pub const ZERO: HashId = HashId([0u8; HASH_LEN]);

    /// Hash arbitrary bytes with blake3.
    pub fn digest(data: &[u8]) -> Self {
        HashId(*blake3::hash(data).as_bytes())
    }

    /// Hash several byte slices as if they were concatenated.
    pub fn digest_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        HashId(*hasher.finalize().as_bytes())
    }

    /// Build an id from a slice. Returns `None` unless the slice is exactly
    /// [`HASH_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; HASH_LEN] = bytes.try_into().ok()?;
        Some(HashId(arr))
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_LEN]
    }

    /// First six bytes in hex, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Display for HashId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for HashId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashId({})", self.short())
    }
}
