use anyhow::Result;
use async_trait::async_trait;
use log::info;
use subnet::Notifier;

/// Writes every outbound message to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, chat_id: Option<i64>, text: &str) -> Result<()> {
        match chat_id {
            Some(chat_id) => info!("[reply to {}]\n{}", chat_id, text),
            None => info!("[notify]\n{}", text),
        }
        Ok(())
    }
}
