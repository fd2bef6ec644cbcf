//! Conversation-name resolution.
//!
//! Tries, in order: a public or private channel by name, then a user by
//! handle, real name, or display name (opened as a direct message).

use serde::Deserialize;
use slackcat_channels::{ChannelError, Destination};
use tracing::debug;

use crate::client::SlackClient;

const PAGE_LIMIT: &str = "200";

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub real_name: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Deserialize)]
struct ConversationsPage {
    #[serde(default)]
    channels: Vec<ConversationInfo>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Deserialize)]
struct UsersPage {
    #[serde(default)]
    members: Vec<UserInfo>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Deserialize)]
struct OpenedConversation {
    channel: ConversationInfo,
}

/// Resolve a channel, group, or user name to a conversation id.
pub async fn resolve_destination(
    client: &SlackClient,
    name: &str,
) -> Result<Destination, ChannelError> {
    let wanted = name.trim_start_matches(['#', '@']);

    let channels = list_conversations(client).await?;
    if let Some(c) = find_conversation(&channels, wanted) {
        debug!(name, id = %c.id, "resolved channel");
        return Ok(Destination {
            name: name.to_string(),
            id: c.id.clone(),
        });
    }

    let users = list_users(client).await?;
    if let Some(user) = find_user(&users, wanted) {
        let opened: OpenedConversation = client
            .post_json(
                "conversations.open",
                &serde_json::json!({ "users": user.id }),
            )
            .await?;
        debug!(name, user_id = %user.id, id = %opened.channel.id, "resolved direct message");
        return Ok(Destination {
            name: name.to_string(),
            id: opened.channel.id,
        });
    }

    Err(ChannelError::NotFound(format!(
        "no such channel, group, or im: {name}"
    )))
}

async fn list_conversations(client: &SlackClient) -> Result<Vec<ConversationInfo>, ChannelError> {
    let mut all = Vec::new();
    let mut cursor = String::new();
    loop {
        let page: ConversationsPage = client
            .get(
                "conversations.list",
                &[
                    ("types", "public_channel,private_channel"),
                    ("exclude_archived", "true"),
                    ("limit", PAGE_LIMIT),
                    ("cursor", cursor.as_str()),
                ],
            )
            .await?;
        all.extend(page.channels);
        match next_cursor(page.response_metadata) {
            Some(next) => cursor = next,
            None => return Ok(all),
        }
    }
}

async fn list_users(client: &SlackClient) -> Result<Vec<UserInfo>, ChannelError> {
    let mut all = Vec::new();
    let mut cursor = String::new();
    loop {
        let page: UsersPage = client
            .get("users.list", &[("limit", PAGE_LIMIT), ("cursor", cursor.as_str())])
            .await?;
        all.extend(page.members);
        match next_cursor(page.response_metadata) {
            Some(next) => cursor = next,
            None => return Ok(all),
        }
    }
}

fn next_cursor(meta: Option<ResponseMetadata>) -> Option<String> {
    meta.map(|m| m.next_cursor).filter(|c| !c.is_empty())
}

pub fn find_conversation<'a>(
    channels: &'a [ConversationInfo],
    name: &str,
) -> Option<&'a ConversationInfo> {
    channels.iter().find(|c| c.name == name)
}

/// Match by handle first, then real name, then display name. Deactivated users are skipped.
pub fn find_user<'a>(users: &'a [UserInfo], name: &str) -> Option<&'a UserInfo> {
    let active = || users.iter().filter(|u| !u.deleted);
    active()
        .find(|u| u.name == name)
        .or_else(|| {
            active().find(|u| {
                u.profile.real_name == name || u.real_name.as_deref() == Some(name)
            })
        })
        .or_else(|| active().find(|u| !name.is_empty() && u.profile.display_name == name))
}
