//! Per-request routing options.
//!
//! `source` and `destination` distinguish an originating write from a relayed
//! one:
//!
//! - originating: `source` is empty on the caller's options, and every
//!   outgoing message carries `source == destination == replica id`
//! - relayed: `source` names the vnode that already applied the operation and
//!   is propagated unchanged to every other replica

use crate::hash::HashId;
use serde::{Deserialize, Serialize};

/// Replica-set width used when the caller does not pick one.
pub const DEFAULT_PEER_SET_SIZE: usize = 3;

/// Routing metadata attached to every coordinator request and to each
/// message the coordinator sends on its behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Vnode that already applied this operation. `None` on the originating call.
    pub source: Option<HashId>,
    /// Vnode this particular message targets.
    pub destination: Option<HashId>,
    /// Desired replica-set width, at least 1.
    pub peer_set_size: usize,
    /// Hash used to pick the peer set for this destination.
    pub peer_set_key: Option<HashId>,
}

/// Options for the transaction-log variant. Same shape as [`RequestOptions`].
pub type TxOptions = RequestOptions;

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            source: None,
            destination: None,
            peer_set_size: DEFAULT_PEER_SET_SIZE,
            peer_set_key: None,
        }
    }
}

impl RequestOptions {
    /// Default options with a specific replica-set width. Zero is raised to 1.
    pub fn with_peer_set_size(peer_set_size: usize) -> Self {
        Self {
            peer_set_size: peer_set_size.max(1),
            ..Self::default()
        }
    }

    /// Mark these options as relayed from `source`.
    pub fn relayed_from(mut self, source: HashId) -> Self {
        self.source = Some(source);
        self
    }

    /// True when this call is relayed from a peer that already holds the data.
    pub fn is_relay(&self) -> bool {
        self.source.is_some()
    }

    /// Replica-set width with the `>= 1` floor applied.
    pub fn effective_peer_set_size(&self) -> usize {
        self.peer_set_size.max(1)
    }

    /// Options for one outgoing message to the vnode `destination`, holding the
    /// replica of `key`.
    ///
    /// A relayed request keeps its source; an originating one names the
    /// destination as its own source.
    pub fn for_destination(&self, destination: HashId, key: HashId) -> Self {
        Self {
            source: Some(self.source.unwrap_or(destination)),
            destination: Some(destination),
            peer_set_size: self.effective_peer_set_size(),
            peer_set_key: Some(key),
        }
    }
}
