use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use subnet::NetUid;

pub const DEFAULT_MULTIPLIER: f64 = 1.0;
pub const MULTIPLIER_STEP: f64 = 0.1;
pub const MIN_MULTIPLIER: f64 = 0.1;

/// Keeps repeated +/- 0.1 steps from drifting (1.0 + 0.1 + 0.1 == 1.2).
fn normalise(multiplier: f64) -> f64 {
    (multiplier * 1e6).round() / 1e6
}

/// User-adjustable allocation inputs: per-subnet multipliers, the exclusion
/// set and the per-cycle base stake amount.
///
/// Entries are keyed by netuid and outlive the subnet's presence in any given
/// snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    multipliers: BTreeMap<NetUid, f64>,
    excluded: BTreeSet<NetUid>,
    base_amount: f64,
}

impl Preferences {
    pub fn new(base_amount: f64) -> Result<Self> {
        let mut prefs = Self {
            multipliers: BTreeMap::new(),
            excluded: BTreeSet::new(),
            base_amount: 0.0,
        };
        prefs.set_base_amount(base_amount)?;
        Ok(prefs)
    }

    /// Seeds a multiplier from configuration.
    pub fn with_multiplier(mut self, netuid: NetUid, multiplier: f64) -> Result<Self> {
        if !multiplier.is_finite() || multiplier < MIN_MULTIPLIER {
            return Err(EngineError::config(format!(
                "preference for subnet {} must be >= {}, got {}",
                netuid, MIN_MULTIPLIER, multiplier
            )));
        }
        self.multipliers.insert(netuid, normalise(multiplier));
        Ok(self)
    }

    pub fn with_excluded(mut self, netuids: impl IntoIterator<Item = NetUid>) -> Self {
        self.excluded.extend(netuids);
        self
    }

    pub fn get_multiplier(&self, netuid: NetUid) -> f64 {
        self.multipliers
            .get(&netuid)
            .copied()
            .unwrap_or(DEFAULT_MULTIPLIER)
    }

    /// Raises the multiplier by one step and returns the new value.
    pub fn boost(&mut self, netuid: NetUid) -> f64 {
        let next = normalise(self.get_multiplier(netuid) + MULTIPLIER_STEP);
        self.multipliers.insert(netuid, next);
        next
    }

    /// Lowers the multiplier by one step, never below `MIN_MULTIPLIER`.
    pub fn slash(&mut self, netuid: NetUid) -> f64 {
        let next = normalise(self.get_multiplier(netuid) - MULTIPLIER_STEP).max(MIN_MULTIPLIER);
        self.multipliers.insert(netuid, next);
        next
    }

    /// Adds the subnet to the exclusion set. Returns `false` if it was already there.
    pub fn exclude(&mut self, netuid: NetUid) -> bool {
        self.excluded.insert(netuid)
    }

    pub fn is_excluded(&self, netuid: NetUid) -> bool {
        self.excluded.contains(&netuid)
    }

    pub fn excluded(&self) -> &BTreeSet<NetUid> {
        &self.excluded
    }

    pub fn multipliers(&self) -> &BTreeMap<NetUid, f64> {
        &self.multipliers
    }

    pub fn base_amount(&self) -> f64 {
        self.base_amount
    }

    /// Replaces the per-cycle stake amount. Rejects non-positive values.
    pub fn set_base_amount(&mut self, value: f64) -> Result<f64> {
        if !value.is_finite() || value <= 0.0 {
            return Err(EngineError::invalid(format!(
                "stake amount must be a positive number, got {}",
                value
            )));
        }
        self.base_amount = value;
        Ok(value)
    }
}
