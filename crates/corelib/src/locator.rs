//! The ring lookup contract consumed by the coordinator.

use crate::error::Result;
use crate::hash::HashId;
use crate::vnode::Vnode;
use async_trait::async_trait;

/// Outcome of resolving a key or hash on the ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// Hash the key resolved to (equal to the input for hash lookups).
    pub hash: HashId,
    /// Vnode that answered the lookup: the ring predecessor of `hash`.
    pub primary: Vnode,
    /// Replica holders in ring-successor order.
    pub successors: Vec<Vnode>,
}

/// Resolves keys and hashes to the vnodes that should hold them.
///
/// Implementations may be local tables or remote lookups; they must be safe
/// to call concurrently from many tasks.
#[async_trait]
pub trait Locator: Send + Sync + 'static {
    /// Hash `key` and return up to `n` successor vnodes.
    async fn lookup_key(&self, key: &[u8], n: usize) -> Result<Lookup>;

    /// Return up to `n` successor vnodes of an already computed hash.
    async fn lookup_hash(&self, hash: &HashId, n: usize) -> Result<Lookup>;
}
