//! slackcat-stream: buffered line streaming with drain-on-shutdown.
//!
//! Lines from a [`LineSource`] accumulate in a [`StreamQueue`]. A
//! [`BatchPoster`] flushes the queue on a fixed interval and posts each batch
//! as one message. A [`ShutdownCoordinator`] turns the first interrupt into a
//! drain (wait until the queue is empty, then finish) and the second into an
//! immediate abort. [`StreamController`] runs all of them together.

pub mod controller;
pub mod error;
pub mod poster;
pub mod queue;
pub mod shutdown;
pub mod source;

pub use controller::{StreamController, StreamOptions};
pub use error::{Result, StreamError};
pub use poster::BatchPoster;
pub use queue::StreamQueue;
pub use shutdown::{spawn_interrupt_listener, ShutdownCoordinator, ShutdownState, StreamOutcome};
pub use source::{LineSource, ReaderSource};
