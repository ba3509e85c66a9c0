//! Chain client adapters.
//!
//! `TimedChain` bounds every call with a deadline so a hung node turns into a
//! `ChainError::Timeout` for that single operation instead of stalling the
//! cycle loop forever.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use subnet::{ChainClient, ChainError, NetUid};

pub mod paper;

pub use paper::PaperChain;

pub struct TimedChain<C> {
    inner: C,
    timeout: Duration,
}

impl<C: ChainClient> TimedChain<C> {
    pub fn new(inner: C, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, ChainError>> + Send,
    ) -> Result<T, ChainError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ChainError::Timeout(self.timeout.as_millis() as u64)),
        }
    }
}

#[async_trait]
impl<C: ChainClient> ChainClient for TimedChain<C> {
    async fn get_block_height(&self) -> Result<u64, ChainError> {
        self.bounded(self.inner.get_block_height()).await
    }

    async fn get_subnet_prices(&self) -> Result<BTreeMap<NetUid, f64>, ChainError> {
        self.bounded(self.inner.get_subnet_prices()).await
    }

    async fn get_wallet_balance(&self) -> Result<f64, ChainError> {
        self.bounded(self.inner.get_wallet_balance()).await
    }

    async fn get_stake(&self, netuid: NetUid) -> Result<f64, ChainError> {
        self.bounded(self.inner.get_stake(netuid)).await
    }

    async fn stake(&self, netuid: NetUid, amount: f64) -> Result<(), ChainError> {
        self.bounded(self.inner.stake(netuid, amount)).await
    }

    async fn unstake(&self, netuid: NetUid, amount: f64) -> Result<(), ChainError> {
        self.bounded(self.inner.unstake(netuid, amount)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct HangingChain;

    #[async_trait]
    impl ChainClient for HangingChain {
        async fn get_block_height(&self) -> Result<u64, ChainError> {
            std::future::pending().await
        }

        async fn get_subnet_prices(&self) -> Result<BTreeMap<NetUid, f64>, ChainError> {
            std::future::pending().await
        }

        async fn get_wallet_balance(&self) -> Result<f64, ChainError> {
            Ok(1.0)
        }

        async fn get_stake(&self, _netuid: NetUid) -> Result<f64, ChainError> {
            Ok(0.0)
        }

        async fn stake(&self, _netuid: NetUid, _amount: f64) -> Result<(), ChainError> {
            std::future::pending().await
        }

        async fn unstake(&self, _netuid: NetUid, _amount: f64) -> Result<(), ChainError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_hung_call_becomes_timeout() {
        let chain = TimedChain::new(HangingChain, Duration::from_millis(20));

        assert_eq!(chain.stake(1, 1.0).await, Err(ChainError::Timeout(20)));
        assert_eq!(chain.get_block_height().await, Err(ChainError::Timeout(20)));
        assert_eq!(chain.get_wallet_balance().await, Ok(1.0));
    }
}
