use std::sync::Arc;
use std::time::Duration;

use slackcat_channels::{Channel, Destination};
use slackcat_core::{BatchFormat, StreamConfig};
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, info};

use crate::error::{Result, StreamError};
use crate::poster::BatchPoster;
use crate::queue::StreamQueue;
use crate::shutdown::{drain_until_empty, ShutdownCoordinator, StreamOutcome};
use crate::source::LineSource;

/// Smallest accepted flush interval; `tokio::time::interval` rejects zero.
const MIN_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub interval: Duration,
    pub format: BatchFormat,
    pub noop: bool,
}

impl StreamOptions {
    pub fn from_config(config: &StreamConfig, noop: bool) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            format: config.format,
            noop,
        }
    }
}

/// Runs ingestion, batch posting and shutdown handling as concurrent tasks.
pub struct StreamController {
    queue: Arc<StreamQueue>,
    poster: BatchPoster,
    interval: Duration,
}

impl StreamController {
    pub fn new(channel: Arc<dyn Channel>, destination: Destination, options: StreamOptions) -> Self {
        let interval = options.interval.max(MIN_INTERVAL);
        let queue = Arc::new(StreamQueue::new());
        let poster = BatchPoster::new(
            Arc::clone(&queue),
            channel,
            destination,
            options.format,
            options.noop,
            interval,
        );
        Self {
            queue,
            poster,
            interval,
        }
    }

    pub fn queue(&self) -> Arc<StreamQueue> {
        Arc::clone(&self.queue)
    }

    /// Run until the stream ends.
    ///
    /// * input exhausted, queue drained -> `Ok(Drained)`
    /// * one interrupt, queue drained -> `Ok(Drained)`
    /// * two interrupts -> `Ok(Aborted)`, unsent lines are abandoned
    /// * failed send -> `Err(StreamError::Send)`
    ///
    /// Whichever task finishes first decides; the others are aborted.
    pub async fn run<S>(self, source: S, signals: mpsc::Receiver<()>) -> Result<StreamOutcome>
    where
        S: LineSource + 'static,
    {
        let Self {
            queue,
            poster,
            interval,
        } = self;

        let mut ingest = tokio::spawn(ingest(source, Arc::clone(&queue), interval));
        let mut posting = tokio::spawn(async move { poster.run().await });
        let mut shutdown =
            tokio::spawn(ShutdownCoordinator::new(Arc::clone(&queue), interval).run(signals));

        let result = tokio::select! {
            res = &mut shutdown => res.map_err(task_error),
            res = &mut posting => match res {
                Ok(Err(e)) => Err(e),
                Ok(Ok(never)) => match never {},
                Err(e) => Err(task_error(e)),
            },
            res = &mut ingest => res.map_err(task_error),
        };

        ingest.abort();
        posting.abort();
        shutdown.abort();
        debug!(?result, remaining = queue.len(), "stream finished");
        result
    }
}

/// Feed every input line into the queue, then wait for the poster to drain it.
async fn ingest<S: LineSource>(mut source: S, queue: Arc<StreamQueue>, interval: Duration) -> StreamOutcome {
    let mut count = 0usize;
    while let Some(line) = source.next_line().await {
        queue.add(line);
        count += 1;
    }
    info!(lines = count, "end of input");
    drain_until_empty(&queue, interval).await;
    StreamOutcome::Drained
}

fn task_error(e: JoinError) -> StreamError {
    StreamError::Task(e.to_string())
}
