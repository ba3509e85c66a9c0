//! Turns smoothed signals and preferences into the cycle's allocation decision.
//!
//! Pure: the same signals, preferences and budget always yield the same
//! decision. The allocator only ever proposes buys; sells are command-only.

use crate::error::{EngineError, Result};
use crate::models::preferences::Preferences;
use crate::signal::Signals;
use serde::{Deserialize, Serialize};
use subnet::{AllocationDecision, AllocationLeg, NetUid, ROOT_NETUID};

/// Smallest on-chain unit (1 rao = 1e-9 TAO).
const UNIT: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AllocationPolicy {
    /// Everything into the best subnet.
    #[default]
    SingleBest,
    /// Score-weighted split across the `k` best subnets.
    TopK { k: usize },
}

impl AllocationPolicy {
    pub fn from_name(name: &str, k: usize) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "single-best" | "single_best" => Ok(Self::SingleBest),
            "top-k" | "top_k" if k >= 1 => Ok(Self::TopK { k }),
            "top-k" | "top_k" => Err(EngineError::config("allocation_top_k must be >= 1")),
            other => Err(EngineError::config(format!(
                "unknown allocation policy '{}'",
                other
            ))),
        }
    }
}

/// A subnet that passed the eligibility filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredSubnet {
    pub netuid: NetUid,
    pub signal: f64,
    pub multiplier: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Allocator {
    policy: AllocationPolicy,
}

impl Allocator {
    pub fn new(policy: AllocationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    /// Eligible subnets, best first. Ties go to the lower netuid.
    ///
    /// Skips the root network, excluded subnets, and anything whose score is
    /// not strictly positive.
    pub fn rank(&self, signals: &Signals, prefs: &Preferences) -> Vec<ScoredSubnet> {
        let mut ranked: Vec<ScoredSubnet> = signals
            .iter()
            .filter(|&(&netuid, _)| netuid != ROOT_NETUID && !prefs.is_excluded(netuid))
            .map(|(&netuid, &signal)| {
                let multiplier = prefs.get_multiplier(netuid);
                ScoredSubnet {
                    netuid,
                    signal,
                    multiplier,
                    score: signal * multiplier,
                }
            })
            .filter(|s| s.score.is_finite() && s.score > 0.0)
            .collect();

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.netuid.cmp(&b.netuid)));
        ranked
    }

    /// Builds this cycle's decision. An empty decision is a no-op cycle.
    pub fn decide(
        &self,
        signals: &Signals,
        prefs: &Preferences,
        base_amount: f64,
    ) -> AllocationDecision {
        if !base_amount.is_finite() || base_amount <= 0.0 {
            return AllocationDecision::new();
        }

        let ranked = self.rank(signals, prefs);
        let Some(best) = ranked.first() else {
            return AllocationDecision::new();
        };

        match self.policy {
            AllocationPolicy::SingleBest => AllocationDecision::single(
                AllocationLeg::buy(best.netuid, base_amount).with_score(best.score, best.multiplier),
            ),
            AllocationPolicy::TopK { k } => split(&ranked[..k.max(1).min(ranked.len())], base_amount),
        }
    }
}

/// Score-weighted split, each amount floored to whole units.
fn split(top: &[ScoredSubnet], base_amount: f64) -> AllocationDecision {
    let total_score: f64 = top.iter().map(|s| s.score).sum();
    let mut legs: Vec<AllocationLeg> = top
        .iter()
        .map(|s| {
            let share = base_amount * (s.score / total_score);
            let amount = (share / UNIT).floor() * UNIT;
            AllocationLeg::buy(s.netuid, amount).with_score(s.score, s.multiplier)
        })
        .filter(|leg| leg.amount > 0.0)
        .collect();

    // Float error on the way back from units must never push us over budget.
    let total: f64 = legs.iter().map(|l| l.amount).sum();
    if total > base_amount {
        if let Some(last) = legs.last_mut() {
            last.amount = (last.amount - (total - base_amount) - UNIT).max(0.0);
        }
        legs.retain(|leg| leg.amount > 0.0);
    }

    let mut decision = AllocationDecision::new();
    for leg in legs {
        decision.push(leg);
    }
    decision
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(pairs: &[(NetUid, f64)]) -> Signals {
        pairs.iter().copied().collect()
    }

    fn prefs() -> Preferences {
        Preferences::new(1.0).unwrap()
    }

    #[test]
    fn test_preference_scenario_picks_subnet_nine() {
        let prefs = prefs()
            .with_multiplier(4, 1.5)
            .unwrap()
            .with_multiplier(9, 2.0)
            .unwrap();
        let signals = signals(&[(4, 1.0), (9, 0.8)]);
        let allocator = Allocator::default();

        let ranked = allocator.rank(&signals, &prefs);
        assert!((ranked[0].score - 1.6).abs() < 1e-12);
        assert!((ranked[1].score - 1.5).abs() < 1e-12);

        let decision = allocator.decide(&signals, &prefs, 1.0);
        assert_eq!(decision.len(), 1);
        assert_eq!(decision.legs()[0].netuid, 9);
        assert_eq!(decision.legs()[0].amount, 1.0);
    }

    #[test]
    fn test_ties_go_to_lower_netuid() {
        let signals = signals(&[(12, 2.0), (5, 2.0), (8, 1.0)]);
        let decision = Allocator::default().decide(&signals, &prefs(), 1.0);
        assert_eq!(decision.legs()[0].netuid, 5);
    }

    #[test]
    fn test_excluded_and_root_never_selected() {
        let mut prefs = prefs();
        prefs.exclude(7);
        let signals = signals(&[(0, 100.0), (7, 50.0), (3, 0.1)]);

        let decision = Allocator::default().decide(&signals, &prefs, 1.0);
        assert_eq!(decision.legs()[0].netuid, 3);

        let ranked = Allocator::default().rank(&signals, &prefs);
        assert!(ranked.iter().all(|s| s.netuid != 7 && s.netuid != 0));
    }

    #[test]
    fn test_nothing_eligible_is_empty_decision() {
        let mut prefs = prefs();
        prefs.exclude(1);
        let allocator = Allocator::default();

        assert!(allocator.decide(&signals(&[(1, 1.0)]), &prefs, 1.0).is_empty());
        assert!(allocator.decide(&signals(&[]), &prefs, 1.0).is_empty());
        assert!(allocator.decide(&signals(&[(2, 0.0)]), &prefs, 1.0).is_empty());
    }

    #[test]
    fn test_decision_is_deterministic() {
        let signals = signals(&[(1, 0.3), (2, 0.7), (3, 0.7), (4, 0.1)]);
        let allocator = Allocator::new(AllocationPolicy::TopK { k: 3 });
        let first = allocator.decide(&signals, &prefs(), 2.0);
        for _ in 0..10 {
            assert_eq!(allocator.decide(&signals, &prefs(), 2.0), first);
        }
    }

    #[test]
    fn test_never_sells() {
        let signals = signals(&[(1, 0.3), (2, 0.7), (3, 0.9)]);
        for policy in [AllocationPolicy::SingleBest, AllocationPolicy::TopK { k: 2 }] {
            let decision = Allocator::new(policy).decide(&signals, &prefs(), 1.0);
            assert!(decision.iter().all(|leg| leg.is_buy()));
        }
    }

    #[test]
    fn test_budget_invariant_across_inputs() {
        let budgets = [0.1, 0.3, 1.0, 1.0 / 3.0, 7.77, 123.456789123];
        let signal_sets = [
            signals(&[(1, 0.3), (2, 0.7), (3, 0.7)]),
            signals(&[(1, 1e-6), (2, 1e6)]),
            signals(&[(1, 0.1), (2, 0.2), (3, 0.3), (4, 0.4), (5, 0.5)]),
        ];
        let policies = [
            AllocationPolicy::SingleBest,
            AllocationPolicy::TopK { k: 1 },
            AllocationPolicy::TopK { k: 3 },
            AllocationPolicy::TopK { k: 10 },
        ];

        for policy in policies {
            for signals in &signal_sets {
                for &budget in &budgets {
                    let decision = Allocator::new(policy).decide(signals, &prefs(), budget);
                    assert!(
                        decision.total_buys() <= budget,
                        "{:?} spent {} of {}",
                        policy,
                        decision.total_buys(),
                        budget
                    );
                }
            }
        }
    }

    #[test]
    fn test_top_k_weights_follow_scores() {
        let signals = signals(&[(1, 1.0), (2, 3.0), (3, 0.5)]);
        let decision = Allocator::new(AllocationPolicy::TopK { k: 2 }).decide(&signals, &prefs(), 1.0);

        assert_eq!(decision.len(), 2);
        assert_eq!(decision.legs()[0].netuid, 2);
        assert!((decision.legs()[0].amount - 0.75).abs() < 1e-9);
        assert_eq!(decision.legs()[1].netuid, 1);
        assert!((decision.legs()[1].amount - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_budget_is_noop() {
        let signals = signals(&[(1, 1.0)]);
        assert!(Allocator::default().decide(&signals, &prefs(), 0.0).is_empty());
        assert!(Allocator::default().decide(&signals, &prefs(), f64::NAN).is_empty());
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(
            AllocationPolicy::from_name("single-best", 0).unwrap(),
            AllocationPolicy::SingleBest
        );
        assert_eq!(
            AllocationPolicy::from_name("Top-K", 4).unwrap(),
            AllocationPolicy::TopK { k: 4 }
        );
        assert!(AllocationPolicy::from_name("top-k", 0).is_err());
        assert!(AllocationPolicy::from_name("greedy", 2).is_err());
    }
}
