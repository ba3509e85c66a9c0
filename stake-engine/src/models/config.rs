use crate::allocator::AllocationPolicy;
use crate::error::{EngineError, Result};
use crate::models::preferences::{Preferences, MIN_MULTIPLIER};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use subnet::NetUid;

fn default_ema_alpha() -> f64 {
    0.1
}

fn default_update_interval() -> u64 {
    10
}

fn default_cycle_interval_secs() -> u64 {
    12
}

fn default_chain_timeout_ms() -> u64 {
    10_000
}

fn default_policy() -> String {
    "single-best".to_string()
}

fn default_top_k() -> usize {
    3
}

/// Settings loaded once at start-up. They seed the preference store, the EMA
/// tracker and the run-state; nothing re-reads them during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Wallet (coldkey) name.
    pub wallet: String,
    /// Validator hotkey stakes are delegated to.
    #[serde(default)]
    pub validator: String,
    /// Base asset staked per cycle.
    pub stake_amount: f64,
    #[serde(default)]
    pub exclude_list: Vec<NetUid>,
    /// Smoothing factor in (0, 1].
    #[serde(default = "default_ema_alpha")]
    pub ema_alpha: f64,
    /// Per-subnet multipliers. Keys are netuids as strings.
    #[serde(default)]
    pub preferences: BTreeMap<String, f64>,
    /// Cycles between periodic notifications.
    #[serde(default = "default_update_interval")]
    pub telegram_update_interval: u64,
    #[serde(default)]
    pub telegram_token: Option<String>,
    #[serde(default)]
    pub telegram_chat_id: Option<i64>,
    /// Start in the paused state.
    #[serde(default)]
    pub paused: bool,
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,
    #[serde(default = "default_chain_timeout_ms")]
    pub chain_timeout_ms: u64,
    /// `single-best` or `top-k`.
    #[serde(default = "default_policy")]
    pub allocation_policy: String,
    #[serde(default = "default_top_k")]
    pub allocation_top_k: usize,
    /// Append every executed leg to this CSV file.
    #[serde(default)]
    pub journal_path: Option<PathBuf>,
}

impl BotConfig {
    /// Loads the YAML file at `path`, overlaid with `STAKEBOT_*` environment
    /// variables, and validates it.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("STAKEBOT"))
            .build()
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_settings(settings)
    }

    /// Same as `load`, from an in-memory YAML document.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .context("Failed to parse config")?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: config::Config) -> anyhow::Result<Self> {
        let config: BotConfig = settings
            .try_deserialize()
            .context("Failed to deserialize config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(EngineError::config(format!(
                "ema_alpha must be in (0, 1], got {}",
                self.ema_alpha
            )));
        }
        if !self.stake_amount.is_finite() || self.stake_amount <= 0.0 {
            return Err(EngineError::config(format!(
                "stake_amount must be positive, got {}",
                self.stake_amount
            )));
        }
        if self.telegram_update_interval == 0 {
            return Err(EngineError::config("telegram_update_interval must be >= 1"));
        }
        if self.cycle_interval_secs == 0 {
            return Err(EngineError::config("cycle_interval_secs must be >= 1"));
        }
        self.preference_overrides()?;
        self.policy()?;
        Ok(())
    }

    pub fn preference_overrides(&self) -> Result<BTreeMap<NetUid, f64>> {
        self.preferences
            .iter()
            .map(|(key, &multiplier)| {
                let netuid = key.trim().parse::<NetUid>().map_err(|_| {
                    EngineError::config(format!("preference key '{}' is not a netuid", key))
                })?;
                if !multiplier.is_finite() || multiplier < MIN_MULTIPLIER {
                    return Err(EngineError::config(format!(
                        "preference for subnet {} must be >= {}, got {}",
                        netuid, MIN_MULTIPLIER, multiplier
                    )));
                }
                Ok((netuid, multiplier))
            })
            .collect()
    }

    pub fn policy(&self) -> Result<AllocationPolicy> {
        AllocationPolicy::from_name(&self.allocation_policy, self.allocation_top_k)
    }

    /// Initial preference store.
    pub fn initial_preferences(&self) -> Result<Preferences> {
        let mut prefs = Preferences::new(self.stake_amount)
            .map_err(|e| EngineError::config(e.to_string()))?
            .with_excluded(self.exclude_list.iter().copied());
        for (netuid, multiplier) in self.preference_overrides()? {
            prefs = prefs.with_multiplier(netuid, multiplier)?;
        }
        Ok(prefs)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn chain_timeout(&self) -> Duration {
        Duration::from_millis(self.chain_timeout_ms)
    }
}
