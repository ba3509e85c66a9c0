//! # Subnet API
//!
//! Vocabulary shared between the stake engine and the adapters that plug into it.
//!
//! ## Modules
//! - `model`: Subnet identifiers, market snapshots, allocation decisions and inbound commands.
//! - `traits`: Ports for the chain client, the command source and the notification sink.
//! - `error`: Failures reported by chain adapters.

pub mod error;
pub mod model;
pub mod traits;

pub use error::ChainError;
pub use model::decision::{AllocationDecision, AllocationLeg};
pub use model::inbound::Inbound;
pub use model::netuid::{NetUid, ROOT_NETUID};
pub use model::snapshot::MarketSnapshot;
pub use traits::chain::ChainClient;
pub use traits::command_source::CommandSource;
pub use traits::notifier::Notifier;

pub mod prelude {
    pub use crate::model::decision::{AllocationDecision, AllocationLeg};
    pub use crate::model::netuid::NetUid;
    pub use crate::model::snapshot::MarketSnapshot;
    pub use crate::traits::chain::ChainClient;
}
