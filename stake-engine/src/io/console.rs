use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use subnet::{CommandSource, Inbound};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Reads one command per line from stdin. Used when no Telegram token is set.
pub struct ConsoleSource {
    lines: Lines<BufReader<Stdin>>,
    closed: bool,
}

impl ConsoleSource {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            closed: false,
        }
    }
}

impl Default for ConsoleSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandSource for ConsoleSource {
    async fn next_batch(&mut self) -> Result<Vec<Inbound>> {
        if !self.closed {
            match self.lines.next_line().await.context("Failed to read stdin")? {
                Some(line) => return Ok(Inbound::from_text(&line, None).into_iter().collect()),
                None => {
                    info!("stdin closed, no more console commands");
                    self.closed = true;
                }
            }
        }
        // Keep the server parked instead of spinning on a closed stream.
        std::future::pending().await
    }
}
