pub mod chain;
pub mod command_source;
pub mod notifier;
