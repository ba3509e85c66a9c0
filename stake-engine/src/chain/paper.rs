//! A paper chain: wallet, stakes and subnet prices held in memory.
//!
//! Stakes are held as alpha shares bought at the current price, so a stake's
//! base-asset value moves with its subnet price. With a non-zero volatility,
//! prices follow a random walk, one step per elapsed block.

use async_trait::async_trait;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use subnet::{ChainClient, ChainError, NetUid};

const GENESIS_BLOCK: u64 = 4_000_000;

struct PaperState {
    wallet_balance: f64,
    /// Alpha shares per subnet.
    shares: BTreeMap<NetUid, f64>,
    prices: BTreeMap<NetUid, f64>,
    /// Blocks added by hand on top of the wall-clock height.
    manual_blocks: u64,
    walked_to: u64,
    rejected: BTreeSet<NetUid>,
    offline: bool,
}

pub struct PaperChain {
    state: Mutex<PaperState>,
    started: Instant,
    block_time: Duration,
    volatility: f64,
}

impl PaperChain {
    /// Creates a chain with static prices whose height only moves through
    /// `advance_blocks`.
    pub fn new(wallet_balance: f64, prices: impl IntoIterator<Item = (NetUid, f64)>) -> Self {
        Self {
            state: Mutex::new(PaperState {
                wallet_balance,
                shares: BTreeMap::new(),
                prices: prices.into_iter().collect(),
                manual_blocks: 0,
                walked_to: GENESIS_BLOCK,
                rejected: BTreeSet::new(),
                offline: false,
            }),
            started: Instant::now(),
            block_time: Duration::ZERO,
            volatility: 0.0,
        }
    }

    /// Seeds `subnets` subnets (netuid 0 included) with random prices.
    pub fn random(wallet_balance: f64, subnets: u16) -> Self {
        let mut rng = rand::thread_rng();
        let prices: Vec<(NetUid, f64)> = (0..subnets)
            .map(|netuid| (netuid, rng.gen_range(0.005..0.2)))
            .collect();
        Self::new(wallet_balance, prices)
    }

    /// Height advances once per `block_time` of wall clock.
    pub fn with_block_time(mut self, block_time: Duration) -> Self {
        self.block_time = block_time;
        self
    }

    /// Relative price step per block, e.g. 0.01 for +/- 1%.
    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility.max(0.0);
        self
    }

    fn lock(&self) -> MutexGuard<'_, PaperState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn height(&self, state: &PaperState) -> u64 {
        let elapsed = if self.block_time.is_zero() {
            0
        } else {
            (self.started.elapsed().as_millis() / self.block_time.as_millis()) as u64
        };
        GENESIS_BLOCK + elapsed + state.manual_blocks
    }

    /// Brings prices up to the current height.
    fn walk(&self, state: &mut PaperState) {
        let height = self.height(state);
        let steps = height.saturating_sub(state.walked_to);
        state.walked_to = height;
        if self.volatility == 0.0 || steps == 0 {
            return;
        }

        let mut rng = rand::thread_rng();
        for price in state.prices.values_mut() {
            for _ in 0..steps.min(1_000) {
                let change = rng.gen_range(-self.volatility..self.volatility);
                *price = (*price * (1.0 + change)).max(0.0001);
            }
        }
    }

    fn check_online(state: &PaperState) -> Result<(), ChainError> {
        if state.offline {
            return Err(ChainError::unavailable("paper chain is offline"));
        }
        Ok(())
    }

    pub fn advance_blocks(&self, blocks: u64) {
        let mut state = self.lock();
        state.manual_blocks += blocks;
        self.walk(&mut state);
    }

    pub fn set_price(&self, netuid: NetUid, price: f64) {
        self.lock().prices.insert(netuid, price);
    }

    pub fn remove_subnet(&self, netuid: NetUid) {
        self.lock().prices.remove(&netuid);
    }

    /// Every stake/unstake on `netuid` will be refused.
    pub fn reject_subnet(&self, netuid: NetUid) {
        self.lock().rejected.insert(netuid);
    }

    pub fn accept_subnet(&self, netuid: NetUid) {
        self.lock().rejected.remove(&netuid);
    }

    /// Every call fails with `ChainError::Unavailable` while offline.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }
}

#[async_trait]
impl ChainClient for PaperChain {
    async fn get_block_height(&self) -> Result<u64, ChainError> {
        let state = self.lock();
        Self::check_online(&state)?;
        Ok(self.height(&state))
    }

    async fn get_subnet_prices(&self) -> Result<BTreeMap<NetUid, f64>, ChainError> {
        let mut state = self.lock();
        Self::check_online(&state)?;
        self.walk(&mut state);
        Ok(state.prices.clone())
    }

    async fn get_wallet_balance(&self) -> Result<f64, ChainError> {
        let state = self.lock();
        Self::check_online(&state)?;
        Ok(state.wallet_balance)
    }

    async fn get_stake(&self, netuid: NetUid) -> Result<f64, ChainError> {
        let state = self.lock();
        Self::check_online(&state)?;
        let shares = state.shares.get(&netuid).copied().unwrap_or(0.0);
        let price = state.prices.get(&netuid).copied().unwrap_or(0.0);
        Ok(shares * price)
    }

    async fn stake(&self, netuid: NetUid, amount: f64) -> Result<(), ChainError> {
        let mut state = self.lock();
        Self::check_online(&state)?;
        if state.rejected.contains(&netuid) {
            return Err(ChainError::rejected(netuid, "subnet refused the extrinsic"));
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ChainError::rejected(netuid, "amount must be positive"));
        }
        if amount > state.wallet_balance {
            return Err(ChainError::rejected(
                netuid,
                format!(
                    "insufficient balance: {:.4} < {:.4}",
                    state.wallet_balance, amount
                ),
            ));
        }
        let price = match state.prices.get(&netuid) {
            Some(&p) if p > 0.0 => p,
            _ => return Err(ChainError::rejected(netuid, "subnet does not exist")),
        };

        state.wallet_balance -= amount;
        *state.shares.entry(netuid).or_insert(0.0) += amount / price;
        Ok(())
    }

    async fn unstake(&self, netuid: NetUid, amount: f64) -> Result<(), ChainError> {
        let mut state = self.lock();
        Self::check_online(&state)?;
        if state.rejected.contains(&netuid) {
            return Err(ChainError::rejected(netuid, "subnet refused the extrinsic"));
        }
        let price = match state.prices.get(&netuid) {
            Some(&p) if p > 0.0 => p,
            _ => return Err(ChainError::rejected(netuid, "subnet does not exist")),
        };
        let held = state.shares.get(&netuid).copied().unwrap_or(0.0);
        let shares = amount / price;
        // Tolerate float dust when unstaking everything.
        if !amount.is_finite() || amount <= 0.0 || shares > held * (1.0 + 1e-9) {
            return Err(ChainError::rejected(
                netuid,
                format!("cannot unstake {:.4}, holding {:.4}", amount, held * price),
            ));
        }

        state.shares.insert(netuid, (held - shares).max(0.0));
        state.wallet_balance += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stake_moves_balance_into_shares() {
        let chain = PaperChain::new(10.0, vec![(1, 0.5)]);
        chain.stake(1, 2.0).await.unwrap();

        assert!((chain.get_wallet_balance().await.unwrap() - 8.0).abs() < 1e-12);
        assert!((chain.get_stake(1).await.unwrap() - 2.0).abs() < 1e-12);

        chain.set_price(1, 1.0);
        assert!((chain.get_stake(1).await.unwrap() - 4.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_overspend_and_oversell_are_rejected() {
        let chain = PaperChain::new(1.0, vec![(1, 0.5)]);
        assert!(matches!(
            chain.stake(1, 2.0).await,
            Err(ChainError::Rejected { netuid: 1, .. })
        ));

        chain.stake(1, 1.0).await.unwrap();
        assert!(chain.unstake(1, 1.5).await.is_err());
        chain.unstake(1, 1.0).await.unwrap();
        assert!((chain.get_wallet_balance().await.unwrap() - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_offline_fails_everything() {
        let chain = PaperChain::new(1.0, vec![(1, 0.5)]);
        chain.set_offline(true);
        assert!(matches!(
            chain.get_block_height().await,
            Err(ChainError::Unavailable(_))
        ));
        assert!(chain.get_subnet_prices().await.is_err());
    }

    #[tokio::test]
    async fn test_manual_blocks_and_random_walk() {
        let chain = PaperChain::new(1.0, vec![(1, 0.5)]).with_volatility(0.01);
        let start = chain.get_block_height().await.unwrap();

        chain.advance_blocks(5);

        assert_eq!(chain.get_block_height().await.unwrap(), start + 5);
        let price = chain.get_subnet_prices().await.unwrap()[&1];
        assert!(price > 0.5 * 0.99f64.powi(5) - 1e-12);
        assert!(price < 0.5 * 1.01f64.powi(5) + 1e-12);
    }
}
