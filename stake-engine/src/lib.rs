//! # Stake Engine
//!
//! Allocates a per-cycle stake budget across subnets from smoothed price
//! signals and user preferences, and takes live commands while it runs.
//!
//! ## Modules
//! - `signal`: Per-subnet EMA of the subnet price.
//! - `allocator`: Scoring and the allocation policies.
//! - `models`: Preferences, ledger, history, journal, run-state and configuration.
//! - `engine`: Shared state and the cycle runner.
//! - `command`: Command parsing, execution and the command server.
//! - `chain`: Paper chain and the timeout wrapper.
//! - `io`: CLI arguments and command channel adapters.

pub mod allocator;
pub mod chain;
pub mod command;
pub mod engine;
pub mod error;
pub mod io;
pub mod models;
pub mod signal;

pub use error::{EngineError, Result};
