//! User-visible message output.

use std::fmt;

/// Severity of a displayed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageLevel {
    Info,
    Success,
    Error,
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        })
    }
}

/// Receives success and error strings meant for the player or level author.
pub trait MessageSink {
    fn display(&mut self, level: MessageLevel, message: &str);
}

/// Forwards messages to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl MessageSink for LogSink {
    fn display(&mut self, level: MessageLevel, message: &str) {
        match level {
            MessageLevel::Error => log::warn!("{message}"),
            MessageLevel::Info | MessageLevel::Success => log::info!("{message}"),
        }
    }
}

/// Collects messages in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VecSink {
    pub messages: Vec<(MessageLevel, String)>,
}

impl VecSink {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Messages at `level`.
    pub fn at(&self, level: MessageLevel) -> impl Iterator<Item = &str> + '_ {
        self.messages
            .iter()
            .filter(move |(l, _)| *l == level)
            .map(|(_, message)| message.as_str())
    }
}

impl MessageSink for VecSink {
    fn display(&mut self, level: MessageLevel, message: &str) {
        self.messages.push((level, message.to_owned()));
    }
}
