//! Slack Web API backend for slackcat.
//!
//! [`SlackAdapter`] implements [`slackcat_channels::Channel`] on top of a thin
//! [`SlackClient`] that speaks the handful of Web API methods slackcat needs:
//! `auth.test`, `conversations.list`, `users.list`, `conversations.open`,
//! `chat.postMessage` and the external file upload pair.

pub mod adapter;
pub mod client;
pub mod lookup;
pub mod send;
pub mod upload;

pub use adapter::SlackAdapter;
pub use client::{AuthIdentity, SlackClient};
