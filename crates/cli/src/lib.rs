//! Command-line driver for the block ring.
//!
//! Every invocation builds a fresh ring of in-process hosts, optionally takes
//! some of them down, and runs one subcommand through the replication
//! coordinator:
//! - `locate`: show the replica set for a key
//! - `put`: write a block to its primary and read it back
//! - `append`: grow a block-backed log through propose and commit
//! - `tx`: grow a transaction log through propose and commit

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult, Session};
pub use config::CliConfig;
