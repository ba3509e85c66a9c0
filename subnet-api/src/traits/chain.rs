//! Defines the `ChainClient` trait, the engine's only view of the chain.
//!
//! Adapters (a live node, the paper chain, scripted test doubles) implement this
//! so the engine never depends on how balances are queried or extrinsics are
//! submitted.

use crate::error::ChainError;
use crate::model::netuid::NetUid;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current block height.
    async fn get_block_height(&self) -> Result<u64, ChainError>;

    /// Price of every subnet, in base asset per alpha share.
    async fn get_subnet_prices(&self) -> Result<BTreeMap<NetUid, f64>, ChainError>;

    /// Free balance of the coldkey, in base asset.
    async fn get_wallet_balance(&self) -> Result<f64, ChainError>;

    /// Amount currently staked on `netuid` through the configured validator.
    async fn get_stake(&self, netuid: NetUid) -> Result<f64, ChainError>;

    /// Moves `amount` of free balance into `netuid`.
    ///
    /// # Returns
    ///
    /// * `Ok(())` once the transaction is accepted.
    /// * `Err(ChainError)` if the node is unreachable or refuses the extrinsic.
    async fn stake(&self, netuid: NetUid, amount: f64) -> Result<(), ChainError>;

    /// Moves `amount` out of `netuid` back to free balance.
    async fn unstake(&self, netuid: NetUid, amount: f64) -> Result<(), ChainError>;
}

#[async_trait]
impl<T: ChainClient + ?Sized> ChainClient for Arc<T> {
    async fn get_block_height(&self) -> Result<u64, ChainError> {
        (**self).get_block_height().await
    }

    async fn get_subnet_prices(&self) -> Result<BTreeMap<NetUid, f64>, ChainError> {
        (**self).get_subnet_prices().await
    }

    async fn get_wallet_balance(&self) -> Result<f64, ChainError> {
        (**self).get_wallet_balance().await
    }

    async fn get_stake(&self, netuid: NetUid) -> Result<f64, ChainError> {
        (**self).get_stake(netuid).await
    }

    async fn stake(&self, netuid: NetUid, amount: f64) -> Result<(), ChainError> {
        (**self).stake(netuid, amount).await
    }

    async fn unstake(&self, netuid: NetUid, amount: f64) -> Result<(), ChainError> {
        (**self).unstake(netuid, amount).await
    }
}
