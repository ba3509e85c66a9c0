//! Shared state and the cycle runner.
//!
//! Two locks guard everything commands and cycles share:
//!
//! * the **book** (`tokio::sync::Mutex`) holds the ledger, the history baseline
//!   and the journal. A cycle keeps it for its whole decide-execute-record
//!   sequence, chain awaits included.
//! * the **control** state (`std::sync::Mutex`) holds preferences and the
//!   run-state. It is only ever locked for synchronous reads and writes.
//!
//! When both are needed, the book is always taken first.

use crate::allocator::Allocator;
use crate::error::{EngineError, Result};
use crate::models::{
    ApplyReport, BotConfig, HistoryAccumulator, Journal, JournalEntry, JournalWriter, Ledger,
    Origin, Preferences, RunState,
};
use crate::signal::EmaTracker;
use chrono::Utc;
use log::{error, info, warn};
use std::fmt::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use subnet::{ChainClient, MarketSnapshot, Notifier};
use tokio::time::MissedTickBehavior;

mod overview;

pub use overview::Overview;

#[derive(Debug, Clone)]
pub struct ControlState {
    pub preferences: Preferences,
    pub run_state: RunState,
}

pub struct Book {
    pub ledger: Ledger,
    pub history: HistoryAccumulator,
    pub journal: Journal,
    /// Height seen by the latest cycle or chain read.
    pub last_block: u64,
}

pub struct SharedState {
    control: Mutex<ControlState>,
    book: tokio::sync::Mutex<Book>,
}

impl SharedState {
    pub fn new(control: ControlState, book: Book) -> Self {
        Self {
            control: Mutex::new(control),
            book: tokio::sync::Mutex::new(book),
        }
    }

    /// Never hold the returned guard across an `.await`.
    pub fn control(&self) -> MutexGuard<'_, ControlState> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn book(&self) -> tokio::sync::MutexGuard<'_, Book> {
        self.book.lock().await
    }

    pub fn run_state(&self) -> RunState {
        self.control().run_state
    }

    pub fn preferences(&self) -> Preferences {
        self.control().preferences.clone()
    }
}

/// Builds the shared state from configuration and whatever the chain reports.
///
/// Reconciliation and the initial block read are best effort: a chain that is
/// down at start-up leaves an empty ledger and block 0 as the baseline.
pub async fn bootstrap(config: &BotConfig, chain: &dyn ChainClient) -> Result<SharedState> {
    let preferences = config.initial_preferences()?;
    let run_state = RunState::from_paused(config.paused);

    let mut ledger = Ledger::new(0.0);
    if let Err(e) = ledger.reconcile(chain).await {
        warn!("Initial reconciliation failed, starting from an empty ledger: {}", e);
    }
    let block = match chain.get_block_height().await {
        Ok(block) => block,
        Err(e) => {
            warn!("Could not read block height at start-up: {}", e);
            0
        }
    };

    info!(
        "Starting at block {} with wallet {:.4} and {} position(s), state {}",
        block,
        ledger.wallet_balance(),
        ledger.positions().len(),
        run_state
    );

    let history = HistoryAccumulator::new(ledger.reading(block, Utc::now()));
    let journal = Journal::new(config.journal_path.clone().map(JournalWriter::new));

    Ok(SharedState::new(
        ControlState {
            preferences,
            run_state,
        },
        Book {
            ledger,
            history,
            journal,
            last_block: block,
        },
    ))
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Paused,
    Skipped(EngineError),
    /// Nothing was eligible.
    Idle { block: u64 },
    Executed { block: u64, report: ApplyReport },
}

pub struct Engine {
    state: Arc<SharedState>,
    chain: Arc<dyn ChainClient>,
    notifier: Arc<dyn Notifier>,
    tracker: EmaTracker,
    allocator: Allocator,
    notify_every: u64,
    cycles: u64,
}

impl Engine {
    pub fn new(
        state: Arc<SharedState>,
        chain: Arc<dyn ChainClient>,
        notifier: Arc<dyn Notifier>,
        config: &BotConfig,
    ) -> Result<Self> {
        Ok(Self {
            state,
            chain,
            notifier,
            tracker: EmaTracker::new(config.ema_alpha)?,
            allocator: Allocator::new(config.policy()?),
            notify_every: config.telegram_update_interval.max(1),
            cycles: 0,
        })
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn tracker(&self) -> &EmaTracker {
        &self.tracker
    }

    /// Runs one cycle per `period` until the task is dropped. Late ticks are
    /// skipped rather than replayed.
    pub async fn run(mut self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Cycle loop started, period {:?}", period);
        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    async fn fetch_snapshot(&self) -> Result<MarketSnapshot> {
        let block = self
            .chain
            .get_block_height()
            .await
            .map_err(|e| EngineError::StaleSnapshot(e.to_string()))?;
        let prices = self
            .chain
            .get_subnet_prices()
            .await
            .map_err(|e| EngineError::StaleSnapshot(e.to_string()))?;
        Ok(MarketSnapshot::new(block, prices))
    }

    pub async fn run_cycle(&mut self) -> CycleOutcome {
        if !self.state.run_state().is_running() {
            info!("Paused, no allocation this cycle");
            return CycleOutcome::Paused;
        }

        let snapshot = match self.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Cycle skipped: {}", e);
                return CycleOutcome::Skipped(e);
            }
        };
        let block = snapshot.block();
        let signals = self.tracker.observe(&snapshot);

        let mut book = self.state.book().await;

        // One copy of the control inputs for the whole cycle.
        let (preferences, run_state) = {
            let control = self.state.control();
            (control.preferences.clone(), control.run_state)
        };
        if !run_state.is_running() {
            info!("Paused while waiting for the book, no allocation at block {}", block);
            info!(
                "{}",
                Overview {
                    snapshot: &snapshot,
                    signals: &signals,
                    preferences: &preferences,
                    ledger: &book.ledger,
                    report: None,
                    paused: true,
                }
            );
            return CycleOutcome::Paused;
        }

        self.cycles += 1;
        book.last_block = block;

        let decision = self
            .allocator
            .decide(&signals, &preferences, preferences.base_amount());

        let report = if decision.is_empty() {
            info!("Block {}: no eligible subnet among {}", block, snapshot.len());
            None
        } else {
            let report = book.ledger.apply(self.chain.as_ref(), &decision).await;
            for leg in &report.executed {
                book.journal.record(JournalEntry::new(leg, block, Origin::Cycle));
                if leg.is_buy() {
                    book.history.record_buy();
                }
            }
            info!(
                "Block {}: staked {:.4} across {} leg(s), {} failed",
                block,
                report.total_bought(),
                report.executed.len(),
                report.failed.len()
            );
            Some(report)
        };

        info!(
            "{}",
            Overview {
                snapshot: &snapshot,
                signals: &signals,
                preferences: &preferences,
                ledger: &book.ledger,
                report: report.as_ref(),
                paused: false,
            }
        );

        let summary = if self.cycles % self.notify_every == 0 {
            periodic_summary(block, &mut book)
        } else {
            None
        };
        drop(book);

        if let Some(report) = &report {
            for (leg, e) in &report.failed {
                self.notify(&format!(
                    "Stake error on subnet {} ({:.4} TAO): {}",
                    leg.netuid, leg.amount, e
                ))
                .await;
            }
        }
        if let Some(text) = summary {
            self.notify(&text).await;
        }

        match report {
            Some(report) => CycleOutcome::Executed { block, report },
            None => CycleOutcome::Idle { block },
        }
    }

    async fn notify(&self, text: &str) {
        if let Err(e) = self.notifier.notify(text).await {
            error!("Failed to send notification: {:#}", e);
        }
    }
}

/// Drains the journal into a staking update, if it holds at least one buy.
fn periodic_summary(block: u64, book: &mut Book) -> Option<String> {
    if !book.journal.pending().iter().any(JournalEntry::is_buy) {
        return None;
    }
    let entries = book.journal.drain();

    let mut text = String::new();
    let _ = writeln!(text, "*Staking Update*");
    let _ = writeln!(text, "Block: `{}`", block);
    let _ = writeln!(text);
    let _ = writeln!(text, "*Summary:*");
    let _ = writeln!(
        text,
        "Wallet Balance: `{:.4}` TAO | Total Stake: `{:.4}` TAO | Total Stake Value: `{:.4}` TAO",
        book.ledger.wallet_balance(),
        book.ledger.total_principal(),
        book.ledger.total_staked()
    );
    let _ = writeln!(text);
    let _ = write!(text, "*Purchase History:*");
    for entry in &entries {
        let verb = if entry.is_buy() { "staked" } else { "unstaked" };
        let _ = write!(
            text,
            "\n- Block `{}`: Subnet `{}` {} `{:.4}` TAO (score: `{:.4}`, mult: `{:.2}`)",
            entry.block,
            entry.netuid,
            verb,
            entry.amount.abs(),
            entry.score,
            entry.multiplier
        );
    }
    Some(text)
}
