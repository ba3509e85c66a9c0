pub mod config;
pub mod history;
pub mod journal;
pub mod ledger;
pub mod preferences;
pub mod run_state;

pub use self::config::*;
pub use history::*;
pub use journal::*;
pub use ledger::*;
pub use preferences::*;
pub use run_state::*;

#[cfg(test)]
mod tests;
