pub mod ema;

pub use ema::{EmaTracker, Signals};
