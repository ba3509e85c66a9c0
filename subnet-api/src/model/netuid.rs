//! Identity of a subnet on chain.

/// Numeric subnet identifier as used by the chain.
pub type NetUid = u16;

/// The root network. It carries no alpha market and is never a staking candidate.
pub const ROOT_NETUID: NetUid = 0;
