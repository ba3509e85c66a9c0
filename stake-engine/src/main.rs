use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use stake_engine::chain::{PaperChain, TimedChain};
use stake_engine::command::{CommandProcessor, CommandServer};
use stake_engine::engine::{bootstrap, Engine};
use stake_engine::io::{Args, ConsoleSource, LogNotifier, TelegramApi, TelegramPoller};
use stake_engine::models::BotConfig;
use std::sync::Arc;
use std::time::Duration;
use subnet::{ChainClient, Notifier};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = BotConfig::load(&args.config)?;
    if args.paused {
        config.paused = true;
    }
    info!(
        "=== Stake Engine Starting: wallet {}, validator {}, {:.4} TAO per cycle ===",
        config.wallet, config.validator, config.stake_amount
    );

    // 1. Chain
    let paper = PaperChain::random(args.paper_balance, args.paper_subnets)
        .with_block_time(config.cycle_interval())
        .with_volatility(0.01);
    let chain: Arc<dyn ChainClient> = Arc::new(TimedChain::new(paper, config.chain_timeout()));

    // 2. Shared state
    let state = Arc::new(
        bootstrap(&config, chain.as_ref())
            .await
            .context("Failed to initialise shared state")?,
    );

    // 3. Command channel
    let processor = CommandProcessor::new(state.clone(), chain.clone());
    let notifier: Arc<dyn Notifier> = match config.telegram_token.as_deref() {
        Some(token) if !token.is_empty() => {
            let api = TelegramApi::new(token, config.telegram_chat_id)?;
            let poller = TelegramPoller::new(api.clone(), config.telegram_chat_id);
            let notifier: Arc<dyn Notifier> = Arc::new(api);
            tokio::spawn(CommandServer::new(poller, processor, notifier.clone()).run());
            info!("Listening for Telegram commands");
            notifier
        }
        _ => {
            let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
            tokio::spawn(CommandServer::new(ConsoleSource::new(), processor, notifier.clone()).run());
            info!("No Telegram token, reading commands from stdin");
            notifier
        }
    };

    // 4. Cycle loop
    let engine = Engine::new(state, chain, notifier, &config)?;
    let period = config.cycle_interval();
    tokio::select! {
        _ = engine.run(period) => {}
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        }
    }

    // Leave a moment for in-flight replies.
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(())
}
