//! History accumulator behind `/history`.
//!
//! Holds exactly one baseline. Each report is computed against it and the
//! baseline is replaced by the reading that produced the report, so periods
//! never overlap and never leave gaps.
//!
//! Stake deltas are taken on principal, the base asset actually put in. Price
//! moves only reach the report through PNL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use subnet::NetUid;

const DUST: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReading {
    timestamp: DateTime<Utc>,
    block: u64,
    wallet_balance: f64,
    /// Principal per subnet.
    stakes: BTreeMap<NetUid, f64>,
    /// Market value of all stakes.
    stake_value: f64,
}

impl PortfolioReading {
    pub fn new(
        timestamp: DateTime<Utc>,
        block: u64,
        wallet_balance: f64,
        stakes: BTreeMap<NetUid, f64>,
    ) -> Self {
        let stake_value = stakes.values().sum();
        Self {
            timestamp,
            block,
            wallet_balance,
            stakes,
            stake_value,
        }
    }

    /// Overrides the stake value, which otherwise equals total principal.
    pub fn with_stake_value(mut self, stake_value: f64) -> Self {
        self.stake_value = stake_value;
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn block(&self) -> u64 {
        self.block
    }

    pub fn wallet_balance(&self) -> f64 {
        self.wallet_balance
    }

    pub fn stakes(&self) -> &BTreeMap<NetUid, f64> {
        &self.stakes
    }

    pub fn total_principal(&self) -> f64 {
        self.stakes.values().sum()
    }

    pub fn stake_value(&self) -> f64 {
        self.stake_value
    }

    pub fn combined_value(&self) -> f64 {
        self.wallet_balance + self.stake_value
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryReport {
    pub elapsed_secs: f64,
    pub elapsed_blocks: u64,
    /// Sum of the positive per-subnet stake deltas.
    pub total_staked: f64,
    pub net_stake_delta: f64,
    pub pnl: f64,
    /// Non-zero per-subnet deltas, ordered by netuid.
    pub breakdown: Vec<(NetUid, f64)>,
    /// Buys executed since the previous report.
    pub buys: usize,
}

impl fmt::Display for HistoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "*History Summary:*")?;
        writeln!(f, "Time: {:.2} seconds", self.elapsed_secs)?;
        writeln!(f, "Blocks: {}", self.elapsed_blocks)?;
        writeln!(f, "Buys: {}", self.buys)?;
        writeln!(f, "Amount Staked: `{:.4}` TAO", self.total_staked)?;
        writeln!(f, "Net Stake Change: `{:.4}` TAO", self.net_stake_delta)?;
        writeln!(f, "PNL: `{:.4}` TAO", self.pnl)?;
        write!(f, "Changes:")?;
        if self.breakdown.is_empty() {
            write!(f, " None")?;
        }
        for (netuid, delta) in &self.breakdown {
            write!(f, "\n  • Subnet `{}`: `{:+.4}`", netuid, delta)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct HistoryAccumulator {
    baseline: PortfolioReading,
    buys: usize,
}

impl HistoryAccumulator {
    pub fn new(baseline: PortfolioReading) -> Self {
        Self { baseline, buys: 0 }
    }

    pub fn baseline(&self) -> &PortfolioReading {
        &self.baseline
    }

    pub fn record_buy(&mut self) {
        self.buys += 1;
    }

    /// Reports everything that changed between the baseline and `current`,
    /// then makes `current` the new baseline.
    pub fn snapshot_since_last(&mut self, current: PortfolioReading) -> HistoryReport {
        let base = &self.baseline;

        let netuids: BTreeSet<NetUid> = base
            .stakes
            .keys()
            .chain(current.stakes.keys())
            .copied()
            .collect();

        let breakdown: Vec<(NetUid, f64)> = netuids
            .into_iter()
            .filter_map(|netuid| {
                let before = base.stakes.get(&netuid).copied().unwrap_or(0.0);
                let after = current.stakes.get(&netuid).copied().unwrap_or(0.0);
                let delta = after - before;
                (delta.abs() > DUST).then_some((netuid, delta))
            })
            .collect();

        let elapsed_ms = (current.timestamp - base.timestamp).num_milliseconds().max(0);

        let report = HistoryReport {
            elapsed_secs: elapsed_ms as f64 / 1000.0,
            elapsed_blocks: current.block.saturating_sub(base.block),
            total_staked: breakdown.iter().map(|(_, d)| d.max(0.0)).sum(),
            net_stake_delta: breakdown.iter().map(|(_, d)| d).sum(),
            pnl: current.combined_value() - base.combined_value(),
            breakdown,
            buys: self.buys,
        };

        self.baseline = current;
        self.buys = 0;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reading(secs: i64, block: u64, wallet: f64, stakes: &[(NetUid, f64)]) -> PortfolioReading {
        let t0 = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        PortfolioReading::new(
            t0 + Duration::seconds(secs),
            block,
            wallet,
            stakes.iter().copied().collect(),
        )
    }

    #[test]
    fn test_buys_only_period() {
        let mut history = HistoryAccumulator::new(reading(0, 100, 10.0, &[(4, 1.0)]));
        history.record_buy();
        history.record_buy();

        let report =
            history.snapshot_since_last(reading(24, 102, 8.5, &[(4, 1.5), (9, 1.0)]));

        assert_eq!(report.elapsed_blocks, 2);
        assert!((report.elapsed_secs - 24.0).abs() < 1e-9);
        assert!((report.total_staked - 1.5).abs() < 1e-9);
        let breakdown_sum: f64 = report.breakdown.iter().map(|(_, d)| d).sum();
        assert!((breakdown_sum - 1.5).abs() < 1e-9);
        assert_eq!(report.breakdown, vec![(4, 0.5), (9, 1.0)]);
        assert!(report.pnl.abs() < 1e-9);
        assert_eq!(report.buys, 2);
    }

    #[test]
    fn test_second_call_without_activity_is_all_zero() {
        let mut history = HistoryAccumulator::new(reading(0, 100, 10.0, &[]));
        let current = reading(12, 101, 9.0, &[(2, 1.0)]);
        history.snapshot_since_last(current.clone());

        let report = history.snapshot_since_last(current);

        assert_eq!(report.elapsed_blocks, 0);
        assert_eq!(report.elapsed_secs, 0.0);
        assert_eq!(report.total_staked, 0.0);
        assert_eq!(report.net_stake_delta, 0.0);
        assert_eq!(report.pnl, 0.0);
        assert!(report.breakdown.is_empty());
        assert_eq!(report.buys, 0);
    }

    #[test]
    fn test_sells_count_in_net_delta_not_total_staked() {
        let mut history = HistoryAccumulator::new(reading(0, 10, 5.0, &[(1, 3.0), (2, 1.0)]));

        let report = history.snapshot_since_last(reading(5, 11, 6.0, &[(1, 2.0), (2, 1.5)]));

        assert!((report.total_staked - 0.5).abs() < 1e-9);
        assert!((report.net_stake_delta + 0.5).abs() < 1e-9);
        assert!((report.pnl - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_price_moves_show_up_as_pnl_only() {
        let mut history = HistoryAccumulator::new(reading(0, 10, 5.0, &[(1, 2.0)]));
        let revalued = reading(5, 11, 5.0, &[(1, 2.0)]).with_stake_value(2.4);

        let report = history.snapshot_since_last(revalued);

        assert!((report.pnl - 0.4).abs() < 1e-9);
        assert_eq!(report.total_staked, 0.0);
        assert!(report.breakdown.is_empty());
    }

    #[test]
    fn test_baseline_is_replaced() {
        let mut history = HistoryAccumulator::new(reading(0, 10, 5.0, &[]));
        let next = reading(30, 20, 4.0, &[(3, 1.0)]);
        history.snapshot_since_last(next.clone());
        assert_eq!(history.baseline(), &next);
    }

    #[test]
    fn test_report_renders_changes() {
        let mut history = HistoryAccumulator::new(reading(0, 10, 5.0, &[]));
        let text = history
            .snapshot_since_last(reading(1, 11, 4.0, &[(3, 1.0)]))
            .to_string();
        assert!(text.contains("Blocks: 1"));
        assert!(text.contains("Subnet `3`: `+1.0000`"));
    }
}
