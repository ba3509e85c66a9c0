//! Per-cycle subnet overview, logged at `info`.

use crate::models::{ApplyReport, Ledger, Preferences};
use crate::signal::Signals;
use std::fmt;
use subnet::{MarketSnapshot, NetUid, ROOT_NETUID};

pub struct Overview<'a> {
    pub snapshot: &'a MarketSnapshot,
    pub signals: &'a Signals,
    pub preferences: &'a Preferences,
    pub ledger: &'a Ledger,
    pub report: Option<&'a ApplyReport>,
    pub paused: bool,
}

impl Overview<'_> {
    fn action(&self, netuid: NetUid) -> String {
        if self.preferences.is_excluded(netuid) {
            return "Excluded".to_string();
        }
        if self.paused {
            return "Paused".to_string();
        }
        let Some(report) = self.report else {
            return String::new();
        };
        if let Some(leg) = report.executed.iter().find(|l| l.netuid == netuid) {
            return format!("Staked {:.4}", leg.amount);
        }
        match report.failed.iter().find(|(l, _)| l.netuid == netuid) {
            Some((leg, _)) => format!("Failed {:.4}", leg.amount),
            None => String::new(),
        }
    }
}

impl fmt::Display for Overview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Subnet Overview at block {}", self.snapshot.block())?;
        writeln!(
            f,
            "{:>6} {:>10} {:>10} {:>10} {:>9} {:>10}  Action",
            "Subnet", "Price", "Signal", "Score", "Pref Mult", "Stake"
        )?;

        for (&netuid, &price) in self.snapshot.prices() {
            if netuid == ROOT_NETUID || price.is_nan() || price <= 0.0 {
                continue;
            }
            let multiplier = self.preferences.get_multiplier(netuid);
            let (signal, score) = match self.signals.get(&netuid) {
                Some(&s) => (format!("{:.4}", s), format!("{:.4}", s * multiplier)),
                None => ("-".to_string(), "-".to_string()),
            };
            writeln!(
                f,
                "{:>6} {:>10.4} {:>10} {:>10} {:>9.2} {:>10.4}  {}",
                netuid,
                price,
                signal,
                score,
                multiplier,
                self.ledger.stake_of(netuid),
                self.action(netuid)
            )?;
        }

        write!(
            f,
            "Wallet Balance: {:.4} TAO | Total Stake: {:.4} TAO | Total Stake Value: {:.4} TAO",
            self.ledger.wallet_balance(),
            self.ledger.total_principal(),
            self.ledger.total_staked()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::PaperChain;
    use subnet::{AllocationLeg, ChainError};

    fn line_for(text: &str, netuid: NetUid) -> String {
        text.lines()
            .find(|l| l.split_whitespace().next() == Some(&netuid.to_string()))
            .unwrap_or_default()
            .to_string()
    }

    #[tokio::test]
    async fn test_overview_marks_actions_and_totals() {
        let chain = PaperChain::new(10.0, vec![(0, 5.0), (1, 1.0), (2, 1.0), (3, 2.0)]);
        let mut ledger = Ledger::new(10.0);
        ledger.manual_buy(&chain, 3, 1.0).await.unwrap();
        chain.set_price(3, 4.0);
        ledger.reconcile(&chain).await.unwrap();

        let snapshot = MarketSnapshot::new(42, vec![(0, 5.0), (1, 1.0), (2, 1.0), (3, 4.0)]);
        let signals: Signals = vec![(1, 1.0), (3, 3.0)].into_iter().collect();
        let preferences = Preferences::new(1.0).unwrap().with_excluded([1]);
        let report = ApplyReport {
            executed: vec![AllocationLeg::buy(3, 1.0)],
            failed: vec![(AllocationLeg::buy(2, 1.0), ChainError::Timeout(5))],
        };

        let text = Overview {
            snapshot: &snapshot,
            signals: &signals,
            preferences: &preferences,
            ledger: &ledger,
            report: Some(&report),
            paused: false,
        }
        .to_string();

        assert!(text.starts_with("Subnet Overview at block 42"));
        assert!(line_for(&text, 0).is_empty());
        assert!(line_for(&text, 1).ends_with("Excluded"));
        assert!(line_for(&text, 2).contains(" - "));
        assert!(line_for(&text, 2).ends_with("Failed 1.0000"));
        assert!(line_for(&text, 3).ends_with("Staked 1.0000"));
        assert!(text.ends_with(
            "Wallet Balance: 9.0000 TAO | Total Stake: 1.0000 TAO | Total Stake Value: 2.0000 TAO"
        ));
    }

    #[test]
    fn test_paused_overview() {
        let snapshot = MarketSnapshot::new(7, vec![(4, 1.0)]);
        let signals: Signals = vec![(4, 1.0)].into_iter().collect();
        let preferences = Preferences::new(1.0).unwrap();
        let ledger = Ledger::new(1.0);

        let text = Overview {
            snapshot: &snapshot,
            signals: &signals,
            preferences: &preferences,
            ledger: &ledger,
            report: None,
            paused: true,
        }
        .to_string();

        assert!(line_for(&text, 4).ends_with("Paused"));
    }
}
