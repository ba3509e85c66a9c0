//! Portfolio ledger: the in-memory mirror of confirmed on-chain positions.
//!
//! Every mutation follows execute-then-record: a leg is tentatively booked,
//! sent to the chain, and rolled back if the chain does not confirm it. The
//! ledger therefore never holds a position the chain has not accepted.

use crate::error::{EngineError, Result};
use crate::models::history::PortfolioReading;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use subnet::{AllocationDecision, AllocationLeg, ChainClient, ChainError, NetUid};

const DUST: f64 = 1e-12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Current market value, in base asset.
    staked: f64,
    /// Base asset put in and not yet taken out. Price moves never change it.
    principal: f64,
}

impl Position {
    pub fn staked(&self) -> f64 {
        self.staked
    }

    pub fn principal(&self) -> f64 {
        self.principal
    }
}

/// Outcome of executing a decision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub executed: Vec<AllocationLeg>,
    pub failed: Vec<(AllocationLeg, ChainError)>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total_bought(&self) -> f64 {
        self.executed
            .iter()
            .filter(|l| l.is_buy())
            .map(|l| l.amount)
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    wallet_balance: f64,
    positions: BTreeMap<NetUid, Position>,
}

impl Ledger {
    pub fn new(wallet_balance: f64) -> Self {
        Self {
            wallet_balance: wallet_balance.max(0.0),
            positions: BTreeMap::new(),
        }
    }

    pub fn wallet_balance(&self) -> f64 {
        self.wallet_balance
    }

    pub fn position(&self, netuid: NetUid) -> Position {
        self.positions.get(&netuid).copied().unwrap_or_default()
    }

    pub fn stake_of(&self, netuid: NetUid) -> f64 {
        self.position(netuid).staked
    }

    pub fn positions(&self) -> &BTreeMap<NetUid, Position> {
        &self.positions
    }

    /// Market value of every position.
    pub fn total_staked(&self) -> f64 {
        self.positions.values().map(|p| p.staked).sum()
    }

    pub fn total_principal(&self) -> f64 {
        self.positions.values().map(|p| p.principal).sum()
    }

    /// Wallet balance plus everything staked.
    pub fn combined_value(&self) -> f64 {
        self.wallet_balance + self.total_staked()
    }

    /// Point-in-time reading for the history accumulator: principal per
    /// subnet, valued at the current market value.
    pub fn reading(&self, block: u64, timestamp: DateTime<Utc>) -> PortfolioReading {
        let principal = self
            .positions
            .iter()
            .filter(|(_, p)| p.principal > DUST)
            .map(|(&netuid, p)| (netuid, p.principal))
            .collect();
        PortfolioReading::new(timestamp, block, self.wallet_balance, principal)
            .with_stake_value(self.total_staked())
    }

    /// Books a leg without touching the chain.
    fn book(&mut self, leg: &AllocationLeg) {
        let position = self.positions.entry(leg.netuid).or_default();
        if leg.is_buy() {
            position.staked += leg.amount;
            position.principal += leg.amount;
            self.wallet_balance = (self.wallet_balance - leg.amount).max(0.0);
        } else {
            let amount = -leg.amount;
            let remaining = (position.staked - amount).max(0.0);
            // Principal leaves in proportion to the value sold.
            position.principal = if position.staked > DUST {
                position.principal * remaining / position.staked
            } else {
                0.0
            };
            position.staked = remaining;
            self.wallet_balance += amount;
        }
    }

    /// Books `leg`, submits it, and restores the previous state if the chain
    /// refuses it.
    async fn execute_leg(&mut self, chain: &dyn ChainClient, leg: &AllocationLeg) -> Result<()> {
        let previous_position = self.positions.get(&leg.netuid).copied();
        let previous_balance = self.wallet_balance;

        self.book(leg);

        let submitted = if leg.is_buy() {
            chain.stake(leg.netuid, leg.amount).await
        } else {
            chain.unstake(leg.netuid, -leg.amount).await
        };

        if let Err(e) = submitted {
            match previous_position {
                Some(p) => {
                    self.positions.insert(leg.netuid, p);
                }
                None => {
                    self.positions.remove(&leg.netuid);
                }
            }
            self.wallet_balance = previous_balance;
            return Err(e.into());
        }
        Ok(())
    }

    /// Executes every leg of `decision` in order.
    ///
    /// Legs that fail are rolled back and reported; the remaining legs still run.
    pub async fn apply(
        &mut self,
        chain: &dyn ChainClient,
        decision: &AllocationDecision,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();

        for leg in decision.iter() {
            if leg.amount.abs() <= DUST {
                continue;
            }
            match self.execute_leg(chain, leg).await {
                Ok(()) => {
                    info!("Executed {:+.4} on subnet {}", leg.amount, leg.netuid);
                    report.executed.push(leg.clone());
                }
                Err(EngineError::Chain(e)) => {
                    warn!("Leg on subnet {} rolled back: {}", leg.netuid, e);
                    report.failed.push((leg.clone(), e));
                }
                Err(other) => {
                    warn!("Leg on subnet {} rolled back: {}", leg.netuid, other);
                    report
                        .failed
                        .push((leg.clone(), ChainError::unavailable(other.to_string())));
                }
            }
        }

        report
    }

    pub async fn manual_buy(
        &mut self,
        chain: &dyn ChainClient,
        netuid: NetUid,
        amount: f64,
    ) -> Result<AllocationLeg> {
        let leg = AllocationLeg::buy(netuid, amount);
        self.execute_leg(chain, &leg).await?;
        Ok(leg)
    }

    /// Unstakes `amount` from `netuid`.
    ///
    /// Fails with `InsufficientPosition`, before any chain call, when the ledger
    /// holds less than `amount` on that subnet.
    pub async fn manual_sell(
        &mut self,
        chain: &dyn ChainClient,
        netuid: NetUid,
        amount: f64,
    ) -> Result<AllocationLeg> {
        let held = self.stake_of(netuid);
        if amount > held + DUST {
            return Err(EngineError::InsufficientPosition {
                netuid,
                requested: amount,
                held,
            });
        }
        let leg = AllocationLeg::sell(netuid, amount);
        self.execute_leg(chain, &leg).await?;
        Ok(leg)
    }

    /// Replaces wallet balance and stake values with what the chain reports.
    ///
    /// Principal is left alone, so a price move is never booked as stake. A
    /// position the chain reports as empty loses its principal, and one the
    /// ledger did not know is adopted at its current value.
    ///
    /// Covers every subnet the chain lists plus every subnet already held. All
    /// reads happen before anything is overwritten, so a failed read leaves the
    /// ledger as it was.
    pub async fn reconcile(&mut self, chain: &dyn ChainClient) -> Result<()> {
        let wallet_balance = chain.get_wallet_balance().await?;
        let mut netuids: Vec<NetUid> = chain.get_subnet_prices().await?.into_keys().collect();
        netuids.extend(self.positions.keys().copied());
        netuids.sort_unstable();
        netuids.dedup();

        let mut stakes = Vec::with_capacity(netuids.len());
        for netuid in netuids {
            stakes.push((netuid, chain.get_stake(netuid).await?));
        }

        self.wallet_balance = wallet_balance.max(0.0);
        for (netuid, staked) in stakes {
            match self.positions.get_mut(&netuid) {
                Some(position) => {
                    position.staked = staked.max(0.0);
                    if position.staked <= DUST {
                        position.principal = 0.0;
                    }
                }
                None if staked > DUST => {
                    self.positions.insert(
                        netuid,
                        Position {
                            staked,
                            principal: staked,
                        },
                    );
                }
                None => {}
            }
        }
        Ok(())
    }
}
