use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the cycle loop allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Running,
    Paused,
}

impl RunState {
    pub fn from_paused(paused: bool) -> Self {
        if paused {
            Self::Paused
        } else {
            Self::Running
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Moves to `Paused`. Returns `true` if the state changed.
    pub fn pause(&mut self) -> bool {
        let changed = self.is_running();
        *self = Self::Paused;
        changed
    }

    /// Moves to `Running`. Returns `true` if the state changed.
    pub fn resume(&mut self) -> bool {
        let changed = !self.is_running();
        *self = Self::Running;
        changed
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Paused => write!(f, "PAUSED"),
        }
    }
}
