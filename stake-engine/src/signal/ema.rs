//! Exponentially smoothed price signal, one per subnet.
//!
//! `smoothed_t = alpha * price_t + (1 - alpha) * smoothed_{t-1}`, seeded with the
//! first observed price. Owned by the cycle runner; commands never touch it.

use crate::error::{EngineError, Result};
use log::debug;
use std::collections::{BTreeMap, HashMap};
use subnet::{MarketSnapshot, NetUid};

/// Signals that are usable for the current cycle, keyed by netuid.
pub type Signals = BTreeMap<NetUid, f64>;

#[derive(Debug, Clone)]
pub struct EmaTracker {
    alpha: f64,
    values: HashMap<NetUid, f64>,
}

impl EmaTracker {
    /// Creates a tracker with smoothing factor `alpha` in `(0, 1]`.
    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(EngineError::config(format!(
                "ema_alpha must be in (0, 1], got {}",
                alpha
            )));
        }
        Ok(Self {
            alpha,
            values: HashMap::new(),
        })
    }

    /// Folds one fresh price into the subnet's signal.
    ///
    /// # Returns
    ///
    /// * `Some(smoothed)` for a finite, non-negative price.
    /// * `None` otherwise; the previous smoothed value is kept untouched.
    pub fn update(&mut self, netuid: NetUid, price: f64) -> Option<f64> {
        if !price.is_finite() || price < 0.0 {
            debug!("Ignoring invalid price {} for subnet {}", price, netuid);
            return None;
        }

        let alpha = self.alpha;
        let smoothed = self
            .values
            .entry(netuid)
            .and_modify(|prev| *prev = alpha * price + (1.0 - alpha) * *prev)
            .or_insert(price);
        Some(*smoothed)
    }

    pub fn get(&self, netuid: NetUid) -> Option<f64> {
        self.values.get(&netuid).copied()
    }

    /// Updates every subnet in the snapshot once and returns the signals that are
    /// valid this cycle. Subnets with an invalid price, or missing from the
    /// snapshot, are left out even if they have a history.
    pub fn observe(&mut self, snapshot: &MarketSnapshot) -> Signals {
        snapshot
            .prices()
            .iter()
            .filter_map(|(&netuid, &price)| self.update(netuid, price).map(|s| (netuid, s)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_first_observation_is_unbiased() {
        let mut ema = EmaTracker::new(0.3).unwrap();
        assert_eq!(ema.update(7, 2.5), Some(2.5));
    }

    #[test]
    fn test_recurrence_holds_over_sequence() {
        let alpha = 0.25;
        let mut ema = EmaTracker::new(alpha).unwrap();
        let prices = [1.0, 1.4, 0.9, 0.0, 3.2, 2.2];

        let mut prev = ema.update(1, prices[0]).unwrap();
        assert!((prev - prices[0]).abs() < EPS);

        for &p in &prices[1..] {
            let next = ema.update(1, p).unwrap();
            let expected = alpha * p + (1.0 - alpha) * prev;
            assert!((next - expected).abs() < EPS, "{} vs {}", next, expected);
            prev = next;
        }
    }

    #[test]
    fn test_invalid_price_keeps_previous_value() {
        let mut ema = EmaTracker::new(0.5).unwrap();
        ema.update(3, 2.0);

        assert_eq!(ema.update(3, f64::NAN), None);
        assert_eq!(ema.update(3, -1.0), None);
        assert_eq!(ema.update(3, f64::INFINITY), None);
        assert_eq!(ema.get(3), Some(2.0));

        assert_eq!(ema.update(3, 4.0), Some(3.0));
    }

    #[test]
    fn test_alpha_one_tracks_price() {
        let mut ema = EmaTracker::new(1.0).unwrap();
        ema.update(2, 5.0);
        assert_eq!(ema.update(2, 1.0), Some(1.0));
    }

    #[test]
    fn test_rejects_out_of_range_alpha() {
        assert!(EmaTracker::new(0.0).is_err());
        assert!(EmaTracker::new(1.5).is_err());
        assert!(EmaTracker::new(f64::NAN).is_err());
    }

    #[test]
    fn test_observe_drops_invalid_and_absent_subnets() {
        let mut ema = EmaTracker::new(0.5).unwrap();
        ema.observe(&MarketSnapshot::new(10, vec![(1, 1.0), (2, 2.0)]));

        let signals = ema.observe(&MarketSnapshot::new(11, vec![(1, f64::NAN), (3, 0.5)]));

        assert_eq!(signals.len(), 1);
        assert_eq!(signals.get(&3), Some(&0.5));
        // Still remembered for when it comes back.
        assert_eq!(ema.get(1), Some(1.0));
        assert_eq!(ema.get(2), Some(2.0));
    }
}
