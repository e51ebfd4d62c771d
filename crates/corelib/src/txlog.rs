//! Transaction log records.
//!
//! A [`Tx`] is one link in the per-key chain; [`Meta`] is the log state a
//! replica reports back after accepting a transaction.

use crate::hash::HashId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tx {
    /// Log key; the coordinator routes on it.
    pub key: Vec<u8>,
    /// Id of the previous transaction, [`HashId::ZERO`] for the first.
    pub previous: HashId,
    pub height: u64,
    pub data: Vec<u8>,
}

impl Tx {
    pub fn new(key: impl Into<Vec<u8>>, previous: HashId, height: u64) -> Self {
        Self {
            key: key.into(),
            previous,
            height,
            data: Vec::new(),
        }
    }

    /// Content hash of the transaction.
    pub fn id(&self) -> HashId {
        let key_len = (self.key.len() as u64).to_be_bytes();
        HashId::digest_parts(&[
            &key_len,
            &self.key,
            self.previous.as_bytes(),
            &self.height.to_be_bytes(),
            &self.data,
        ])
    }
}

/// Log state for a key as seen by one replica.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Meta {
    pub key: Vec<u8>,
    /// Id of the last committed transaction, [`HashId::ZERO`] if none.
    pub last_tx: HashId,
    pub height: u64,
}

impl Meta {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Skeleton of the next transaction chained after this state.
    pub fn next_tx(&self) -> Tx {
        Tx::new(self.key.clone(), self.last_tx, self.height + 1)
    }
}
