use std::fmt;

use serde::{Deserialize, Serialize};

/// A resolved conversation: the name the user typed and the platform id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Human-readable name, used in diagnostics.
    pub name: String,

    /// Platform-native conversation id (e.g. `C024BE91L`).
    pub id: String,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A message to be delivered to a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Platform-native conversation id.
    pub channel_id: String,

    /// Fully rendered body.
    pub content: String,

    /// Formatting hint for the target platform.
    pub format: MessageFormat,
}

impl OutboundMessage {
    pub fn new(channel_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            content: content.into(),
            format: MessageFormat::default(),
        }
    }

    pub fn with_format(mut self, format: MessageFormat) -> Self {
        self.format = format;
        self
    }
}

/// Formatting hint for outbound message content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    /// Raw text; the platform must not interpret markup.
    PlainText,

    /// Markup as understood by the target platform.
    #[default]
    Markdown,
}

/// A file to be shared into a conversation.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub channel_id: String,
    pub file_name: String,
    pub title: String,
    pub bytes: Vec<u8>,
}
