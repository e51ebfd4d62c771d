//! Core library for the block ring.
//!
//! This crate provides the fundamental abstractions the coordinator routes on:
//! - Hash identifiers and partitioners
//! - Virtual nodes and replica locations
//! - Per-request routing options
//! - Content-addressed blocks and transaction log records
//! - The `Locator` contract and an in-memory ring implementing it

pub mod block;
pub mod error;
pub mod hash;
pub mod location;
pub mod locator;
pub mod options;
pub mod partitioner;
pub mod ring;
pub mod txlog;
pub mod vnode;

pub use block::{Block, BlockType, LogBlock, LogEntryBlock, RootBlock, TypedBlock};
pub use error::{CodecError, Error, Result};
pub use hash::HashId;
pub use location::Location;
pub use locator::{Locator, Lookup};
pub use options::{RequestOptions, TxOptions, DEFAULT_PEER_SET_SIZE};
pub use partitioner::{Blake3Partitioner, Partitioner};
pub use ring::{HashRing, RingBuilder};
pub use txlog::{Meta, Tx};
pub use vnode::Vnode;
