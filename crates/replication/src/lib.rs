//! Replication and routing coordinator for the block ring.
//!
//! This crate sits between callers and the ring:
//! - [`LocatorRouter`] resolves keys and hashes to ordered replica sets
//! - [`LogRing`] and [`BlockRing`] create, propose, commit, read and write
//!   through pluggable transports
//! - [`ProximityShift`] optionally forwards block relocation hints to a
//!   migration worker
//!
//! Propose fans out concurrently and fails fast; commit walks replicas in
//! ring order and halts at the first failure; reads stop at the first replica
//! that answers. Nothing is retried and nothing is rolled back.

pub mod block_ring;
pub mod config;
pub mod error;
pub mod fanout;
pub mod local;
pub mod log_ring;
pub mod metrics;
pub mod proximity;
pub mod router;
pub mod transport;

pub use block_ring::BlockRing;
pub use config::{ConfigError, ProximityShiftConfig, RingConfig};
pub use error::{Result, RingError, TransportError};
pub use local::LocalCluster;
pub use log_ring::LogRing;
pub use proximity::{run_shift_worker, ProximityShift, RelocationHint};
pub use router::{LocatorRouter, Route, RouteOutcome};
pub use transport::{BlockTransport, EntryLogTransport, TransportResult, TxLogTransport};
