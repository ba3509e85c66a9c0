use crate::model::inbound::Inbound;
use anyhow::Result;
use async_trait::async_trait;

/// Inbound side of a command channel.
#[async_trait]
pub trait CommandSource: Send {
    /// Waits for the next batch of commands.
    ///
    /// An empty batch is valid (e.g. a long poll that timed out). Errors are
    /// transport errors; the caller backs off and polls again.
    async fn next_batch(&mut self) -> Result<Vec<Inbound>>;
}
