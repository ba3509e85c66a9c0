use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use subnet::{AllocationLeg, NetUid};
use uuid::Uuid;

/// Who asked for a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    Cycle,
    Command,
}

impl Origin {
    fn as_str(&self) -> &'static str {
        match self {
            Origin::Cycle => "cycle",
            Origin::Command => "command",
        }
    }
}

/// One executed leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub timestamp: i64,
    pub block: u64,
    pub netuid: NetUid,
    pub amount: f64,
    pub score: f64,
    pub multiplier: f64,
    pub origin: Origin,
}

impl JournalEntry {
    pub fn new(leg: &AllocationLeg, block: u64, origin: Origin) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now().timestamp_millis(),
            block,
            netuid: leg.netuid,
            amount: leg.amount,
            score: leg.score,
            multiplier: leg.multiplier,
            origin,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.amount > 0.0
    }
}

pub struct JournalWriter {
    file_path: PathBuf,
}

impl JournalWriter {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn log(&mut self, entry: &JournalEntry) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        // Date, Block, Netuid, Amount, Score, Multiplier, Origin, Id
        let date = chrono::DateTime::from_timestamp(entry.timestamp / 1000, 0)
            .unwrap_or_default()
            .to_rfc3339();

        writeln!(
            file,
            "{},{},{},{:.9},{:.6},{:.2},{},{}",
            date,
            entry.block,
            entry.netuid,
            entry.amount,
            entry.score,
            entry.multiplier,
            entry.origin.as_str(),
            entry.id
        )
    }
}

/// Executed legs waiting for the next periodic notification, plus an optional
/// CSV file they are appended to as they happen.
#[derive(Default)]
pub struct Journal {
    pending: Vec<JournalEntry>,
    writer: Option<JournalWriter>,
}

impl Journal {
    pub fn new(writer: Option<JournalWriter>) -> Self {
        Self {
            pending: Vec::new(),
            writer,
        }
    }

    pub fn record(&mut self, entry: JournalEntry) {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.log(&entry) {
                log::error!("Failed to write journal entry {}: {}", entry.id, e);
            }
        }
        self.pending.push(entry);
    }

    pub fn pending(&self) -> &[JournalEntry] {
        &self.pending
    }

    /// Hands over the buffered entries and clears the buffer.
    pub fn drain(&mut self) -> Vec<JournalEntry> {
        std::mem::take(&mut self.pending)
    }
}
