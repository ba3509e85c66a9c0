//! Raw commands as delivered by a command channel.

use serde::{Deserialize, Serialize};

/// A command name plus its positional arguments, still untyped.
///
/// `chat_id` is the address replies should go back to, when the channel has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inbound {
    pub name: String,
    pub args: Vec<String>,
    pub chat_id: Option<i64>,
}

impl Inbound {
    pub fn new(name: impl Into<String>, args: Vec<String>, chat_id: Option<i64>) -> Self {
        Self {
            name: name.into(),
            args,
            chat_id,
        }
    }

    /// Splits a text line on whitespace. Returns `None` for blank input.
    pub fn from_text(text: &str, chat_id: Option<i64>) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let name = parts.next()?;
        Some(Self::new(name, parts.map(str::to_string).collect(), chat_id))
    }
}
