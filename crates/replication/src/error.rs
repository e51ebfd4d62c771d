//! Error types for the coordination layer.
//!
//! | Error | Origin |
//! |-------|--------|
//! | `Lookup` | the locator, passed through verbatim |
//! | `Transport` | the transport call that failed, passed through verbatim |
//! | `NotFound` | synthesized here once every read candidate missed |
//! | `Decode` | a fetched block did not hold the expected payload |
//! | `Task` | a propose task panicked or was aborted |
//!
//! No operation retries. Propose reports the first failure it observes,
//! Commit the first replica that failed, Get only `NotFound` after exhausting
//! its candidates.

use thiserror::Error;

/// Result type alias for coordinator operations.
pub type Result<T> = std::result::Result<T, RingError>;

/// Failure of a single transport call against one replica.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The vnode could not be reached.
    #[error("vnode {0} unavailable")]
    Unavailable(String),
    /// The vnode refused the request.
    #[error("rejected by {vnode}: {reason}")]
    Rejected { vnode: String, reason: String },
    /// A transfer or release named a block nobody holds.
    #[error("block {0} not held")]
    BlockMissing(String),
    /// Anything else reported by the remote end.
    #[error("remote call failed: {0}")]
    Remote(String),
}

#[derive(Debug, Error)]
pub enum RingError {
    #[error(transparent)]
    Lookup(#[from] corelib::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{what} not found after trying {tried} replicas")]
    NotFound { what: &'static str, tried: usize },

    #[error("decode failed: {0}")]
    Decode(#[from] corelib::CodecError),

    #[error("replica task failed: {0}")]
    Task(String),
}

impl RingError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RingError::NotFound { .. })
    }

    /// The transport failure behind this error, if any.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            RingError::Transport(e) => Some(e),
            _ => None,
        }
    }
}
