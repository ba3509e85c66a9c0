//! Market data handed to the engine once per cycle.

use crate::model::netuid::NetUid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Block height plus the price of every subnet the chain reported.
///
/// Prices are kept in a `BTreeMap` so iteration order is the netuid order,
/// which keeps downstream decisions reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    block: u64,
    prices: BTreeMap<NetUid, f64>,
}

impl MarketSnapshot {
    pub fn new(block: u64, prices: impl IntoIterator<Item = (NetUid, f64)>) -> Self {
        Self {
            block,
            prices: prices.into_iter().collect(),
        }
    }

    pub fn block(&self) -> u64 {
        self.block
    }

    pub fn price(&self, netuid: NetUid) -> Option<f64> {
        self.prices.get(&netuid).copied()
    }

    pub fn prices(&self) -> &BTreeMap<NetUid, f64> {
        &self.prices
    }

    pub fn netuids(&self) -> impl Iterator<Item = NetUid> + '_ {
        self.prices.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
