//! Message posting for the Slack backend.
//!
//! `chat.postMessage` truncates `text` past 40 000 characters, so long bodies
//! are split into several posts on line boundaries. When a split falls inside
//! a fenced code block the fence is closed at the end of the chunk and
//! re-opened at the start of the next one.

use std::time::Duration;

use serde::Deserialize;
use slackcat_channels::{ChannelError, MessageFormat};

use crate::client::SlackClient;

/// Maximum bytes per posted chunk (Slack truncates at 40 000; fences need headroom).
pub const CHUNK_MAX: usize = 39_000;

/// Pause between consecutive chunks of one message (chat.postMessage allows ~1/s per channel).
const CHUNK_DELAY: Duration = Duration::from_secs(1);

#[derive(Deserialize)]
struct PostedMessage {
    #[serde(default)]
    ts: String,
}

/// Post `text` to `channel_id`, splitting it when it exceeds [`CHUNK_MAX`].
///
/// Stops at the first failed chunk; the error covers the whole message.
pub async fn post_message(
    client: &SlackClient,
    channel_id: &str,
    text: &str,
    format: MessageFormat,
) -> Result<(), ChannelError> {
    let chunks = split_chunks_smart(text);
    for (i, chunk) in chunks.iter().enumerate() {
        let body = message_body(channel_id, chunk, format);
        let posted: PostedMessage = client.post_json("chat.postMessage", &body).await?;
        tracing::debug!(channel_id, ts = %posted.ts, chunk_index = i, "message chunk posted");

        if i + 1 < chunks.len() {
            tokio::time::sleep(CHUNK_DELAY).await;
        }
    }
    Ok(())
}

/// `chat.postMessage` payload for one chunk. Posts under the token's own
/// identity, so a user token posts as that user.
fn message_body(channel_id: &str, text: &str, format: MessageFormat) -> serde_json::Value {
    serde_json::json!({
        "channel": channel_id,
        "text": text,
        "as_user": true,
        "mrkdwn": format == MessageFormat::Markdown,
        "unfurl_links": false,
    })
}

/// Code-fence-aware message splitter.
pub fn split_chunks_smart(text: &str) -> Vec<String> {
    split_chunks_with_limit(text, CHUNK_MAX)
}

fn split_chunks_with_limit(text: &str, max: usize) -> Vec<String> {
    if text.len() <= max {
        return vec![text.to_string()];
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut fence_lang: Option<String> = None;

    for line in text.split('\n') {
        let cost = if current.is_empty() {
            line.len()
        } else {
            1 + line.len()
        };

        // An open fence must be closed with "\n```" before the chunk ends.
        let reserve = if fence_lang.is_some() { 4 } else { 0 };
        if !current.is_empty() && current.len() + cost + reserve > max {
            if fence_lang.is_some() {
                current.push_str("\n```");
            }
            chunks.push(std::mem::take(&mut current));
            if let Some(ref lang) = fence_lang {
                current.push_str("```");
                current.push_str(lang);
                current.push('\n');
            }
        }

        if !current.is_empty() && !current.ends_with('\n') {
            current.push('\n');
        }
        current.push_str(line);

        // A line containing ``` toggles the fence. Batches are wrapped as
        // ```body```, so the marker can sit at either end of a line.
        let trimmed = line.trim();
        if let Some(after_fence) = trimmed.strip_prefix("```") {
            if fence_lang.is_some() {
                fence_lang = None;
            } else if !after_fence.ends_with("```") {
                fence_lang = Some(String::new());
            }
        } else if trimmed.ends_with("```") {
            fence_lang = None;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    // Force-split anything still too large (a single very long line).
    let mut result = Vec::new();
    for chunk in chunks {
        if chunk.len() <= max {
            result.push(chunk);
            continue;
        }
        let mut remaining = chunk.as_str();
        while remaining.len() > max {
            let window = &remaining[..floor_char_boundary(remaining, max)];
            let split_at = window
                .rfind('\n')
                .or_else(|| window.rfind(' '))
                .filter(|&i| i > 0)
                .unwrap_or(window.len());
            result.push(remaining[..split_at].to_string());
            // Drop the separator we split on, nothing more.
            let skip = if split_at < window.len() { 1 } else { 0 };
            remaining = &remaining[split_at + skip..];
        }
        if !remaining.is_empty() {
            result.push(remaining.to_string());
        }
    }

    result
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
