//! Interrupt handling: first ctrl+c drains the queue, second one aborts.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::queue::StreamQueue;

/// How a stream finished. Both variants exit the process with status 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Every buffered line was posted (or skipped in no-op mode).
    Drained,
    /// A second interrupt arrived while draining; remaining lines were abandoned.
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    Draining,
    Aborted,
}

pub struct ShutdownCoordinator {
    queue: Arc<StreamQueue>,
    interval: Duration,
    state: ShutdownState,
    interrupts: u32,
}

impl ShutdownCoordinator {
    pub fn new(queue: Arc<StreamQueue>, interval: Duration) -> Self {
        Self {
            queue,
            interval,
            state: ShutdownState::Running,
            interrupts: 0,
        }
    }

    pub fn state(&self) -> ShutdownState {
        self.state
    }

    pub fn interrupts(&self) -> u32 {
        self.interrupts
    }

    /// Apply one interrupt to the state machine.
    pub fn on_interrupt(&mut self) -> ShutdownState {
        self.interrupts += 1;
        self.state = match self.state {
            ShutdownState::Running => {
                warn!("got signal: interrupt");
                warn!("press ctrl+c again to exit immediately");
                ShutdownState::Draining
            }
            ShutdownState::Draining | ShutdownState::Aborted => {
                warn!(interrupts = self.interrupts, "abort");
                ShutdownState::Aborted
            }
        };
        self.state
    }

    /// Consume interrupt events until the stream should end.
    ///
    /// Never returns while `Running` unless an interrupt arrives; a closed
    /// signal channel just means no further interrupts.
    pub async fn run(mut self, mut signals: mpsc::Receiver<()>) -> StreamOutcome {
        loop {
            match self.state {
                ShutdownState::Running => match signals.recv().await {
                    Some(()) => {
                        self.on_interrupt();
                    }
                    None => std::future::pending::<()>().await,
                },
                ShutdownState::Draining => {
                    let queue = Arc::clone(&self.queue);
                    tokio::select! {
                        _ = drain_until_empty(&queue, self.interval) => {
                            return StreamOutcome::Drained;
                        }
                        Some(()) = signals.recv() => {
                            self.on_interrupt();
                        }
                    }
                }
                ShutdownState::Aborted => return StreamOutcome::Aborted,
            }
        }
    }
}

/// Poll the queue every `period` until it is empty. The first check is immediate.
pub async fn drain_until_empty(queue: &StreamQueue, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if queue.is_empty() {
            info!("all messages flushed");
            return;
        }
        info!(remaining = queue.len(), "flushing remaining messages to Slack...");
    }
}

/// Forward every ctrl+c to the returned receiver.
pub fn spawn_interrupt_listener() -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(4);
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "unable to listen for interrupt signal");
                return;
            }
            if tx.send(()).await.is_err() {
                return;
            }
        }
    });
    rx
}
