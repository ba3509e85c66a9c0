use subnet::{ChainError, NetUid};
use thiserror::Error;

/// Errors surfaced by the engine. Every variant is scoped to one cycle or one
/// command; none of them stops the run loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed or out-of-range command arguments. Nothing was mutated.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// A sell asked for more than the ledger holds on that subnet.
    #[error("Insufficient position on subnet {netuid}: requested {requested:.4}, held {held:.4}")]
    InsufficientPosition {
        netuid: NetUid,
        requested: f64,
        held: f64,
    },

    /// A chain call failed, timed out or was rejected.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Market data could not be fetched for this cycle.
    #[error("Stale snapshot: {0}")]
    StaleSnapshot(String),

    /// Start-up configuration is unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidCommand(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// A specialized Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
