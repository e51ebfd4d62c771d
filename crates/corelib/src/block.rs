//! Content-addressed blocks.
//!
//! A [`Block`] is a type tag plus raw bytes. Its id is the blake3 hash of both,
//! so the same content always lands on the same ring position. Typed payloads
//! ([`RootBlock`], [`LogBlock`], [`LogEntryBlock`]) travel as generic blocks
//! and are recovered with [`TypedBlock::decode_block`].

use crate::error::CodecError;
use crate::hash::HashId;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Payload type carried by a [`Block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockType {
    Data = 1,
    Root = 2,
    Log = 3,
    LogEntry = 4,
}

impl BlockType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(BlockType::Data),
            2 => Some(BlockType::Root),
            3 => Some(BlockType::Log),
            4 => Some(BlockType::LogEntry),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockType::Data => "data",
            BlockType::Root => "root",
            BlockType::Log => "log",
            BlockType::LogEntry => "log-entry",
        }
    }
}

/// Raw content-addressed bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockType,
    pub data: Bytes,
}

impl Block {
    pub fn new(kind: BlockType, data: impl Into<Bytes>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    /// Plain data block.
    pub fn data(data: impl Into<Bytes>) -> Self {
        Self::new(BlockType::Data, data)
    }

    /// Content hash over the type tag and the data.
    pub fn id(&self) -> HashId {
        HashId::digest_parts(&[&[self.kind.tag()], &self.data])
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A structured payload that travels inside a generic [`Block`].
pub trait TypedBlock: Serialize + DeserializeOwned {
    const KIND: BlockType;

    /// Encode into a generic block tagged with [`Self::KIND`].
    fn to_block(&self) -> Result<Block, CodecError> {
        let data = bincode::serialize(self).map_err(|e| CodecError::Encode {
            kind: Self::KIND.name(),
            reason: e.to_string(),
        })?;
        Ok(Block::new(Self::KIND, data))
    }

    /// Decode from a generic block, checking the type tag first.
    fn decode_block(block: &Block) -> Result<Self, CodecError> {
        if block.kind != Self::KIND {
            return Err(CodecError::UnexpectedKind {
                expected: Self::KIND.name(),
                found: block.kind.name(),
            });
        }
        bincode::deserialize(&block.data).map_err(|e| CodecError::Malformed {
            kind: Self::KIND.name(),
            reason: e.to_string(),
        })
    }
}

/// Index of the data blocks making up one object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RootBlock {
    /// Total object size in bytes.
    pub size: u64,
    /// Size of every data block except possibly the last.
    pub block_size: u32,
    /// Data block ids in object order.
    pub ids: Vec<HashId>,
}

impl TypedBlock for RootBlock {
    const KIND: BlockType = BlockType::Root;
}

/// Committed history of one log key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogBlock {
    pub key: Vec<u8>,
    /// Height of the last committed entry; 0 for an empty log.
    pub height: u64,
    /// Ids of committed entries, oldest first.
    pub entries: Vec<HashId>,
}

impl LogBlock {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Id of the newest committed entry, or [`HashId::ZERO`].
    pub fn last_entry(&self) -> HashId {
        self.entries.last().copied().unwrap_or(HashId::ZERO)
    }
}

impl TypedBlock for LogBlock {
    const KIND: BlockType = BlockType::Log;
}

/// One entry of a log, chained to its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogEntryBlock {
    /// Log key; the coordinator routes on it.
    pub key: Vec<u8>,
    /// Id of the previous entry, [`HashId::ZERO`] for the first.
    pub previous: HashId,
    pub height: u64,
    pub data: Vec<u8>,
}

impl TypedBlock for LogEntryBlock {
    const KIND: BlockType = BlockType::LogEntry;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_id_depends_on_kind_and_data() {
        let a = Block::data(&b"hello"[..]);
        let b = Block::data(&b"hello"[..]);
        let c = Block::new(BlockType::Root, &b"hello"[..]);
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_decode_rejects_wrong_kind() {
        let block = RootBlock::default().to_block().unwrap();
        let err = LogEntryBlock::decode_block(&block).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnexpectedKind {
                expected: "log-entry",
                found: "root"
            }
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let block = Block::new(BlockType::LogEntry, vec![0xff]);
        assert!(matches!(
            LogEntryBlock::decode_block(&block),
            Err(CodecError::Malformed { kind: "log-entry", .. })
        ));
    }

    #[test]
    fn test_entry_survives_block_encoding() {
        let entry = LogEntryBlock {
            key: b"k".to_vec(),
            previous: HashId([3; 32]),
            height: 4,
            data: b"payload".to_vec(),
        };
        let block = entry.to_block().unwrap();
        assert_eq!(block.kind, BlockType::LogEntry);
        assert_eq!(LogEntryBlock::decode_block(&block).unwrap(), entry);
    }

    #[test]
    fn test_log_block_last_entry() {
        let mut log = LogBlock::new(b"k".to_vec());
        assert_eq!(log.last_entry(), HashId::ZERO);
        log.entries.push(HashId([5; 32]));
        assert_eq!(log.last_entry(), HashId([5; 32]));
    }

    #[test]
    fn test_block_type_tags() {
        for kind in [BlockType::Data, BlockType::Root, BlockType::Log, BlockType::LogEntry] {
            assert_eq!(BlockType::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(BlockType::from_tag(0), None);
    }
}
