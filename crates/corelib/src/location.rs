//! Replica locations.

use crate::hash::HashId;
use crate::vnode::Vnode;
use serde::{Deserialize, Serialize};

/// Pairing of a resolved hash with one vnode of its replica set.
///
/// Produced fresh by every lookup and owned by the caller; transports receive
/// it by reference and may return a clone as an acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Hash identifying the key or block.
    pub id: HashId,
    /// The vnode holding this replica.
    pub vnode: Vnode,
    /// Rank in the replica set. 0 is the primary.
    pub priority: u32,
}

impl Location {
    pub fn new(id: HashId, vnode: Vnode, priority: u32) -> Self {
        Self { id, vnode, priority }
    }

    pub fn is_primary(&self) -> bool {
        self.priority == 0
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}#{}", self.id.short(), self.vnode.short(), self.priority)
    }
}
