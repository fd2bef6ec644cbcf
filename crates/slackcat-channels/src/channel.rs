use async_trait::async_trait;

use crate::{
    error::ChannelError,
    types::{Destination, FileUpload, OutboundMessage},
};

/// Common interface implemented by every messaging backend.
///
/// Implementations must be `Send + Sync` so one instance can be shared
/// between the batch poster and the upload path behind an `Arc`.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Stable lowercase identifier for this backend (e.g. `"slack"`).
    fn name(&self) -> &str;

    /// Map a user-supplied conversation name to a [`Destination`].
    async fn resolve(&self, name: &str) -> Result<Destination, ChannelError>;

    /// Deliver a single outbound message.
    ///
    /// A returned error means the message must be treated as not delivered.
    /// There is no partial-success indicator.
    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError>;

    /// Share a file into a conversation.
    async fn upload(&self, file: &FileUpload) -> Result<(), ChannelError>;
}
