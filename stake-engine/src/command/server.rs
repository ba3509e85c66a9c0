use crate::command::processor::error_reply;
use crate::command::{Command, CommandProcessor};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use subnet::{CommandSource, Inbound, Notifier};
use tokio::sync::mpsc;

const RETRY_DELAY: Duration = Duration::from_secs(3);

/// A command waiting for the book, with the chat its reply goes to.
type LedgerJob = (Command, Option<i64>);

/// Pulls commands from a source and answers each on the same channel.
///
/// Preference and run-state commands are answered inline. Commands that need
/// the book go through one queue drained by a single worker, so they run in
/// arrival order and a cycle holding the book does not delay the rest.
pub struct CommandServer<S> {
    source: S,
    processor: CommandProcessor,
    notifier: Arc<dyn Notifier>,
}

impl<S: CommandSource + 'static> CommandServer<S> {
    pub fn new(source: S, processor: CommandProcessor, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            source,
            processor,
            notifier,
        }
    }

    pub async fn run(mut self) {
        info!("Command server started");
        let (ledger_tx, ledger_rx) = mpsc::unbounded_channel();
        tokio::spawn(ledger_worker(
            self.processor.clone(),
            self.notifier.clone(),
            ledger_rx,
        ));

        loop {
            match self.source.next_batch().await {
                Ok(batch) => {
                    for inbound in batch {
                        dispatch(&self.processor, &self.notifier, &ledger_tx, inbound).await;
                    }
                }
                Err(e) => {
                    error!("Command source failed: {:#}", e);
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }
}

async fn ledger_worker(
    processor: CommandProcessor,
    notifier: Arc<dyn Notifier>,
    mut jobs: mpsc::UnboundedReceiver<LedgerJob>,
) {
    while let Some((command, chat_id)) = jobs.recv().await {
        let reply = processor.respond(command).await;
        reply_to(notifier.as_ref(), chat_id, &reply).await;
    }
    debug!("Ledger queue closed");
}

async fn dispatch(
    processor: &CommandProcessor,
    notifier: &Arc<dyn Notifier>,
    ledger_tx: &mpsc::UnboundedSender<LedgerJob>,
    inbound: Inbound,
) {
    debug!("Inbound: {:?}", inbound);

    let command = match Command::try_from(&inbound) {
        Ok(command) => command,
        Err(e) => {
            debug!("Rejected {}: {}", inbound.name, e);
            reply_to(notifier.as_ref(), inbound.chat_id, &error_reply(&e)).await;
            return;
        }
    };

    if command.touches_ledger() {
        if let Err(mpsc::error::SendError((command, chat_id))) =
            ledger_tx.send((command, inbound.chat_id))
        {
            warn!("Ledger worker gone, running {:?} inline", command);
            let reply = processor.respond(command).await;
            reply_to(notifier.as_ref(), chat_id, &reply).await;
        }
    } else {
        let reply = processor.respond(command).await;
        reply_to(notifier.as_ref(), inbound.chat_id, &reply).await;
    }
}

async fn reply_to(notifier: &dyn Notifier, chat_id: Option<i64>, text: &str) {
    if let Err(e) = notifier.send(chat_id, text).await {
        error!("Failed to send reply: {:#}", e);
    }
}
