//! Error types for the core library.

use thiserror::Error;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving keys against the ring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The ring holds no vnodes at all.
    #[error("ring has no vnodes")]
    EmptyRing,
    /// The ring cannot supply as many distinct replica holders as requested.
    #[error("insufficient vnodes: requested {requested}, available {available}")]
    InsufficientVnodes { requested: usize, available: usize },
    /// A host named in a ring operation is not a member.
    #[error("unknown host: {0}")]
    UnknownHost(String),
}

/// Errors raised converting typed blocks to and from generic blocks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unexpected block type: expected {expected}, found {found}")]
    UnexpectedKind { expected: &'static str, found: &'static str },
    #[error("malformed {kind} block: {reason}")]
    Malformed { kind: &'static str, reason: String },
    #[error("failed to encode {kind} block: {reason}")]
    Encode { kind: &'static str, reason: String },
}
