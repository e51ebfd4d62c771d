//! Transport contracts.
//!
//! A transport performs one call against one replica [`Location`]; it may be a
//! network client or a local store. The coordinator shares a single transport
//! between concurrent tasks, so implementations must be `Send + Sync`.
//!
//! Reads return `Ok(None)` when the replica answered but holds nothing. The
//! coordinator treats that like a miss and moves on to the next candidate.
//! Timeouts are the transport's business; the coordinator imposes none.

use crate::error::TransportError;
use async_trait::async_trait;
use corelib::{Block, HashId, Location, LogBlock, LogEntryBlock, Meta, RequestOptions, Tx, TxOptions};

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Transport for the transaction log used by [`LogRing`](crate::LogRing).
#[async_trait]
pub trait TxLogTransport: Send + Sync + 'static {
    /// Allocate the next transaction for `key` at `loc`.
    async fn new_tx(&self, loc: &Location, key: &[u8], opts: &TxOptions) -> TransportResult<(Tx, Meta)>;

    async fn propose_tx(&self, loc: &Location, tx: &Tx, opts: &TxOptions) -> TransportResult<Meta>;

    async fn commit_tx(&self, loc: &Location, tx: &Tx, opts: &TxOptions) -> TransportResult<Meta>;

    async fn get_tx(&self, loc: &Location, id: &HashId, opts: &TxOptions) -> TransportResult<Option<(Tx, Meta)>>;
}

/// Transport for the block-backed log used by [`BlockRing`](crate::BlockRing).
#[async_trait]
pub trait EntryLogTransport: Send + Sync + 'static {
    /// Allocate the next entry for `key` at `loc`.
    async fn new_entry(
        &self,
        loc: &Location,
        key: &[u8],
        opts: &RequestOptions,
    ) -> TransportResult<(LogEntryBlock, Location)>;

    async fn propose_entry(
        &self,
        loc: &Location,
        entry: &LogEntryBlock,
        opts: &RequestOptions,
    ) -> TransportResult<Location>;

    async fn commit_entry(
        &self,
        loc: &Location,
        entry: &LogEntryBlock,
        opts: &RequestOptions,
    ) -> TransportResult<Location>;

    async fn get_log_block(
        &self,
        loc: &Location,
        key: &[u8],
        opts: &RequestOptions,
    ) -> TransportResult<Option<(LogBlock, Location)>>;
}

/// Transport for raw content-addressed blocks.
#[async_trait]
pub trait BlockTransport: Send + Sync + 'static {
    async fn get_block(&self, loc: &Location, id: &HashId) -> TransportResult<Option<Block>>;

    async fn set_block(&self, loc: &Location, block: &Block) -> TransportResult<()>;

    /// Ask the vnode at `loc` to take a copy of block `id`.
    async fn transfer_block(&self, loc: &Location, id: &HashId) -> TransportResult<()>;

    /// Ask the vnode at `loc` to drop its copy of block `id`.
    async fn release_block(&self, loc: &Location, id: &HashId) -> TransportResult<()>;
}
