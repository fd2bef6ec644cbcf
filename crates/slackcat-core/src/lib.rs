pub mod config;
pub mod error;

pub use config::{BatchFormat, ChannelTarget, SlackcatConfig, StreamConfig};
pub use error::{Result, SlackcatError};
