use async_trait::async_trait;
use slackcat_channels::{Channel, ChannelError, Destination, FileUpload, OutboundMessage};
use tracing::info;

use crate::{
    client::{AuthIdentity, SlackClient},
    lookup, send, upload,
};

/// [`Channel`] implementation backed by the Slack Web API.
pub struct SlackAdapter {
    client: SlackClient,
}

impl SlackAdapter {
    pub fn new(client: SlackClient) -> Self {
        Self { client }
    }

    /// Check the token and log the team and user it belongs to.
    pub async fn connect(&self) -> Result<AuthIdentity, ChannelError> {
        let identity = self.client.auth_test().await?;
        info!("connected to {} as {}", identity.team, identity.user);
        Ok(identity)
    }
}

#[async_trait]
impl Channel for SlackAdapter {
    fn name(&self) -> &str {
        "slack"
    }

    async fn resolve(&self, name: &str) -> Result<Destination, ChannelError> {
        lookup::resolve_destination(&self.client, name).await
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        send::post_message(&self.client, &msg.channel_id, &msg.content, msg.format).await
    }

    async fn upload(&self, file: &FileUpload) -> Result<(), ChannelError> {
        upload::upload_file(&self.client, file).await
    }
}
