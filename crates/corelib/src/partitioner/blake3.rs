//! Blake3 partitioner implementation.

use crate::hash::HashId;
use crate::partitioner::traits::Partitioner;

/// Blake3 partitioner. Key hashes and content ids share the same function, so
/// a block's id is also its ring position.
#[derive(Clone, Debug, Default)]
pub struct Blake3Partitioner;

impl Partitioner for Blake3Partitioner {
    fn partition(&self, key: &[u8]) -> HashId {
        HashId::digest(key)
    }

    fn name(&self) -> &'static str {
        "Blake3Partitioner"
    }
}
