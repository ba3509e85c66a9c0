pub mod decision;
pub mod inbound;
pub mod netuid;
pub mod snapshot;

pub use decision::{AllocationDecision, AllocationLeg};
pub use inbound::Inbound;
pub use netuid::NetUid;
pub use snapshot::MarketSnapshot;
