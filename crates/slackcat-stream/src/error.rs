use slackcat_channels::ChannelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    /// Delivery of a batch failed. Fatal: the stream stops and nothing is retried.
    #[error("error posting to {destination}: {source}")]
    Send {
        destination: String,
        source: ChannelError,
    },

    /// A stream task panicked or was cancelled unexpectedly.
    #[error("stream task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, StreamError>;
