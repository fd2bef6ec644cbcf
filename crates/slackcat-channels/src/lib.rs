pub mod channel;
pub mod error;
pub mod types;

pub use channel::Channel;
pub use error::ChannelError;
pub use types::{Destination, FileUpload, MessageFormat, OutboundMessage};
