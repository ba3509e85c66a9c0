use thiserror::Error;

use crate::model::netuid::NetUid;

/// Failure reported by a chain client call.
///
/// None of these are fatal: the engine treats each one as the failure of a
/// single operation and carries on with the next cycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChainError {
    /// The node could not be reached or returned garbage.
    #[error("chain unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within the configured deadline.
    #[error("chain call timed out after {0} ms")]
    Timeout(u64),

    /// The extrinsic was submitted but refused.
    #[error("transaction rejected on subnet {netuid}: {reason}")]
    Rejected { netuid: NetUid, reason: String },
}

impl ChainError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn rejected(netuid: NetUid, reason: impl Into<String>) -> Self {
        Self::Rejected {
            netuid,
            reason: reason.into(),
        }
    }
}
