//! Core partitioner trait definitions.

use crate::hash::HashId;

/// A partitioner converts keys into positions on the hash ring.
///
/// Partitioners are stateless and thread-safe, allowing concurrent
/// lookups without synchronization overhead.
pub trait Partitioner: Send + Sync + 'static {
    /// Converts a key into a ring position.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to partition
    ///
    /// # Returns
    ///
    /// The hash the ring uses to place the key
    fn partition(&self, key: &[u8]) -> HashId;

    /// Returns the name of this partitioner.
    fn name(&self) -> &'static str;
}
