pub mod args;
pub mod console;
pub mod log_notifier;
pub mod telegram;

pub use args::Args;
pub use console::ConsoleSource;
pub use log_notifier::LogNotifier;
pub use telegram::{TelegramApi, TelegramPoller};
