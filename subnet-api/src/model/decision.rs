//! Allocation decisions produced once per cycle.

use crate::model::netuid::NetUid;
use serde::{Deserialize, Serialize};

/// One leg of a decision: how much to move into (positive) or out of
/// (negative) a subnet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationLeg {
    /// The target subnet.
    pub netuid: NetUid,
    /// Signed amount of base asset. Positive = stake, negative = unstake.
    pub amount: f64,
    /// Score the subnet had when the leg was decided (0.0 for manual legs).
    pub score: f64,
    /// Preference multiplier applied to the score.
    pub multiplier: f64,
}

impl AllocationLeg {
    pub fn buy(netuid: NetUid, amount: f64) -> Self {
        Self {
            netuid,
            amount: amount.abs(),
            score: 0.0,
            multiplier: 1.0,
        }
    }

    pub fn sell(netuid: NetUid, amount: f64) -> Self {
        Self {
            netuid,
            amount: -amount.abs(),
            score: 0.0,
            multiplier: 1.0,
        }
    }

    pub fn with_score(mut self, score: f64, multiplier: f64) -> Self {
        self.score = score;
        self.multiplier = multiplier;
        self
    }

    pub fn is_buy(&self) -> bool {
        self.amount > 0.0
    }

    pub fn is_sell(&self) -> bool {
        self.amount < 0.0
    }
}

/// Ordered list of legs for one cycle. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationDecision {
    legs: Vec<AllocationLeg>,
}

impl AllocationDecision {
    pub fn new() -> Self {
        Self { legs: Vec::new() }
    }

    pub fn single(leg: AllocationLeg) -> Self {
        Self { legs: vec![leg] }
    }

    pub fn push(&mut self, leg: AllocationLeg) {
        self.legs.push(leg);
    }

    pub fn legs(&self) -> &[AllocationLeg] {
        &self.legs
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    /// Sum of the positive amounts.
    pub fn total_buys(&self) -> f64 {
        self.legs
            .iter()
            .filter(|l| l.is_buy())
            .map(|l| l.amount)
            .sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AllocationLeg> {
        self.legs.iter()
    }
}

impl<'a> IntoIterator for &'a AllocationDecision {
    type Item = &'a AllocationLeg;
    type IntoIter = std::slice::Iter<'a, AllocationLeg>;

    fn into_iter(self) -> Self::IntoIter {
        self.legs.iter()
    }
}
