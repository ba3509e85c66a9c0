use crate::command::{Command, USAGE};
use crate::engine::{Book, SharedState};
use crate::error::{EngineError, Result};
use crate::models::{JournalEntry, Origin};
use chrono::Utc;
use log::{info, warn};
use std::fmt::Write;
use std::sync::Arc;
use subnet::{ChainClient, Inbound, NetUid};

/// Applies commands to the shared state and renders the reply text.
#[derive(Clone)]
pub struct CommandProcessor {
    state: Arc<SharedState>,
    chain: Arc<dyn ChainClient>,
}

impl CommandProcessor {
    pub fn new(state: Arc<SharedState>, chain: Arc<dyn ChainClient>) -> Self {
        Self { state, chain }
    }

    /// Parses and executes `inbound`. Always produces a reply, errors included.
    pub async fn handle(&self, inbound: &Inbound) -> String {
        match Command::try_from(inbound) {
            Ok(command) => self.respond(command).await,
            Err(e) => error_reply(&e),
        }
    }

    pub async fn respond(&self, command: Command) -> String {
        match self.execute(command.clone()).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("{:?} failed: {}", command, e);
                error_reply(&e)
            }
        }
    }

    pub async fn execute(&self, command: Command) -> Result<String> {
        match command {
            Command::Pause => {
                let changed = self.state.control().run_state.pause();
                if changed {
                    info!("Paused by command");
                    Ok("Bot is now paused. No new staking actions will be performed.".to_string())
                } else {
                    Ok("Bot is already paused.".to_string())
                }
            }
            Command::Start => {
                let changed = self.state.control().run_state.resume();
                if changed {
                    info!("Resumed by command");
                    Ok("Bot has resumed staking.".to_string())
                } else {
                    Ok("Bot is already running.".to_string())
                }
            }
            Command::Boost(netuid) => {
                let multiplier = self.state.control().preferences.boost(netuid);
                Ok(preference_reply(netuid, multiplier))
            }
            Command::Slash(netuid) => {
                let multiplier = self.state.control().preferences.slash(netuid);
                Ok(preference_reply(netuid, multiplier))
            }
            Command::Exclude(netuid) => {
                if self.state.control().preferences.exclude(netuid) {
                    Ok(format!("Subnet {} has been added to the exclude list.", netuid))
                } else {
                    Ok(format!("Subnet {} is already in the exclude list.", netuid))
                }
            }
            Command::Amount(value) => {
                let amount = self.state.control().preferences.set_base_amount(value)?;
                Ok(format!("New stake amount is: `{:.4}` TAO", amount))
            }
            Command::Info(netuid) => self.info(netuid).await,
            Command::Buy { netuid, amount } => self.buy(netuid, amount).await,
            Command::Sell { netuid, amount } => self.sell(netuid, amount).await,
            Command::Balance => self.balance().await,
            Command::History => self.history().await,
        }
    }

    async fn info(&self, netuid: NetUid) -> Result<String> {
        let prices = self.chain.get_subnet_prices().await?;
        let block = self.chain.get_block_height().await?;
        let price = prices
            .get(&netuid)
            .copied()
            .ok_or_else(|| EngineError::invalid(format!("Subnet {} not found.", netuid)))?;

        let stake = self.state.book().await.ledger.stake_of(netuid);
        let (multiplier, excluded) = {
            let control = self.state.control();
            (
                control.preferences.get_multiplier(netuid),
                control.preferences.is_excluded(netuid),
            )
        };

        Ok(format!(
            "*Subnet Info for {}:*\n\
             • *Current Price:* `{:.4}` TAO\n\
             • *Your Stake:* `{:.4}` TAO\n\
             • *Current Preference:* `{:.2}`\n\
             • *Excluded:* `{}`\n\
             • *Current Block:* `{}`",
            netuid,
            price,
            stake,
            multiplier,
            if excluded { "yes" } else { "no" },
            block
        ))
    }

    async fn buy(&self, netuid: NetUid, amount: f64) -> Result<String> {
        let mut book = self.state.book().await;
        let leg = book.ledger.manual_buy(self.chain.as_ref(), netuid, amount).await?;
        let block = book.last_block;
        book.journal.record(JournalEntry::new(&leg, block, Origin::Command));
        book.history.record_buy();

        info!("Manual stake of {:.4} on subnet {}", amount, netuid);
        Ok(format!("Staked {:.4} TAO in subnet {}.", amount, netuid))
    }

    async fn sell(&self, netuid: NetUid, amount: f64) -> Result<String> {
        let mut book = self.state.book().await;
        let leg = book.ledger.manual_sell(self.chain.as_ref(), netuid, amount).await?;
        let block = book.last_block;
        book.journal.record(JournalEntry::new(&leg, block, Origin::Command));

        info!("Manual unstake of {:.4} from subnet {}", amount, netuid);
        Ok(format!("Unstaked {:.4} from subnet {}.", amount, netuid))
    }

    /// Pulls confirmed balances and the current height into the book. Falls
    /// back to what the book already holds when the chain cannot be read.
    async fn refresh(&self, book: &mut Book) -> u64 {
        if let Err(e) = book.ledger.reconcile(self.chain.as_ref()).await {
            warn!("Reconciliation failed, reporting ledger figures: {}", e);
        }
        match self.chain.get_block_height().await {
            Ok(block) => book.last_block = block,
            Err(e) => warn!("Block height unavailable, using {}: {}", book.last_block, e),
        }
        book.last_block
    }

    async fn balance(&self) -> Result<String> {
        let mut book = self.state.book().await;
        let block = self.refresh(&mut book).await;
        let ledger = &book.ledger;

        let mut reply = String::new();
        let _ = writeln!(reply, "*Portfolio Balance Info:*");
        let _ = writeln!(reply, "• Wallet Balance: `{:.4}` TAO", ledger.wallet_balance());
        let _ = writeln!(reply, "• Current Block: `{}`", block);
        let _ = write!(reply, "• Total Stake: `{:.4}` TAO", ledger.total_staked());
        for (netuid, position) in ledger.positions() {
            if position.staked() > 0.0 {
                let _ = write!(
                    reply,
                    "\n• Subnet `{}`: `{:.4}` TAO",
                    netuid,
                    position.staked()
                );
            }
        }
        Ok(reply)
    }

    async fn history(&self) -> Result<String> {
        let mut book = self.state.book().await;
        let block = self.refresh(&mut book).await;
        let reading = book.ledger.reading(block, Utc::now());
        let report = book.history.snapshot_since_last(reading);
        Ok(report.to_string())
    }
}

fn preference_reply(netuid: NetUid, multiplier: f64) -> String {
    format!("New preference for subnet {} is: `{:.2}`", netuid, multiplier)
}

pub(crate) fn error_reply(error: &EngineError) -> String {
    match error {
        EngineError::InvalidCommand(_) => format!("{}\n\n{}", error, USAGE),
        _ => format!("Error: {}", error),
    }
}
