use anyhow::Result;
use async_trait::async_trait;

/// Outbound side of a command channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends `text` to `chat_id`, or to the channel's default recipient when `None`.
    async fn send(&self, chat_id: Option<i64>, text: &str) -> Result<()>;

    /// Unsolicited message (periodic summaries, failure reports).
    async fn notify(&self, text: &str) -> Result<()> {
        self.send(None, text).await
    }
}
