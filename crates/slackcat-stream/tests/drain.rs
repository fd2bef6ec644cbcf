// End-to-end behavior of a running stream against an in-memory channel.
// All tests run on paused tokio time, so the 3 s cadence costs nothing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use slackcat_channels::{Channel, ChannelError, Destination, FileUpload, OutboundMessage};
use slackcat_core::BatchFormat;
use slackcat_stream::{ReaderSource, StreamController, StreamError, StreamOptions, StreamOutcome};
use tokio::sync::mpsc;
use tokio::time::Instant;

const INTERVAL: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Deliver,
    Fail,
    Hang,
}

struct FakeChannel {
    mode: Mode,
    attempts: AtomicUsize,
    delivered: Mutex<Vec<(Instant, OutboundMessage)>>,
}

impl FakeChannel {
    fn new(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            attempts: AtomicUsize::new(0),
            delivered: Mutex::new(Vec::new()),
        })
    }

    /// Lines delivered so far, unwrapped from their code fences, in order.
    fn lines(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, m)| {
                m.content
                    .trim_matches('`')
                    .split('\n')
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn last_delivery(&self) -> Option<Instant> {
        self.delivered.lock().unwrap().last().map(|(t, _)| *t)
    }
}

#[async_trait]
impl Channel for FakeChannel {
    fn name(&self) -> &str {
        "fake"
    }

    async fn resolve(&self, name: &str) -> Result<Destination, ChannelError> {
        Ok(Destination {
            name: name.to_string(),
            id: "C1".to_string(),
        })
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            Mode::Deliver => {
                self.delivered
                    .lock()
                    .unwrap()
                    .push((Instant::now(), msg.clone()));
                Ok(())
            }
            Mode::Fail => Err(ChannelError::Api {
                method: "chat.postMessage".to_string(),
                error: "channel_not_found".to_string(),
            }),
            Mode::Hang => std::future::pending().await,
        }
    }

    async fn upload(&self, _file: &FileUpload) -> Result<(), ChannelError> {
        Ok(())
    }
}

fn controller(channel: Arc<FakeChannel>, noop: bool) -> StreamController {
    let destination = Destination {
        name: "ops".to_string(),
        id: "C1".to_string(),
    };
    StreamController::new(
        channel,
        destination,
        StreamOptions {
            interval: INTERVAL,
            format: BatchFormat::Code,
            noop,
        },
    )
}

#[tokio::test(start_paused = true)]
async fn end_of_input_posts_everything_then_drains() {
    let channel = FakeChannel::new(Mode::Deliver);
    let input: &'static [u8] = b"alpha\nbeta\ngamma\n";
    let (_sig_tx, sig_rx) = mpsc::channel(4);

    let outcome = controller(Arc::clone(&channel), false)
        .run(ReaderSource::new(input, false), sig_rx)
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::Drained);
    assert_eq!(channel.lines(), vec!["alpha", "beta", "gamma"]);
}

#[tokio::test(start_paused = true)]
async fn interrupt_drains_within_one_interval_of_last_send() {
    let channel = FakeChannel::new(Mode::Deliver);
    let (line_tx, line_rx) = mpsc::channel(16);
    let (sig_tx, sig_rx) = mpsc::channel(4);

    for line in ["one", "two", "three"] {
        line_tx.send(line.to_string()).await.unwrap();
    }
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        sig_tx.send(()).await.unwrap();
        // Keep the sender alive so no second interrupt is implied.
        std::future::pending::<()>().await;
    });

    let outcome = controller(Arc::clone(&channel), false)
        .run(line_rx, sig_rx)
        .await
        .unwrap();
    let finished = Instant::now();

    assert_eq!(outcome, StreamOutcome::Drained);
    assert_eq!(channel.lines(), vec!["one", "two", "three"]);
    let last = channel.last_delivery().expect("at least one delivery");
    assert!(finished.duration_since(last) <= INTERVAL);
    drop(line_tx);
}

#[tokio::test(start_paused = true)]
async fn double_interrupt_aborts_before_queue_empties() {
    let channel = FakeChannel::new(Mode::Hang);
    let (_line_tx, line_rx) = mpsc::channel::<String>(1);
    let (sig_tx, sig_rx) = mpsc::channel(4);

    let ctl = controller(Arc::clone(&channel), false);
    let queue = ctl.queue();
    queue.add("stuck");
    queue.add("also stuck");
    sig_tx.send(()).await.unwrap();
    sig_tx.send(()).await.unwrap();

    let outcome = ctl.run(line_rx, sig_rx).await.unwrap();

    assert_eq!(outcome, StreamOutcome::Aborted);
    assert!(!queue.is_empty());
    assert!(channel.attempts.load(Ordering::SeqCst) <= 1);
}

#[tokio::test(start_paused = true)]
async fn failed_send_is_fatal() {
    let channel = FakeChannel::new(Mode::Fail);
    let input: &'static [u8] = b"doomed\n";
    let (_sig_tx, sig_rx) = mpsc::channel(4);

    let err = controller(Arc::clone(&channel), false)
        .run(ReaderSource::new(input, false), sig_rx)
        .await
        .unwrap_err();

    match err {
        StreamError::Send {
            destination,
            source,
        } => {
            assert_eq!(destination, "ops");
            assert!(source.to_string().contains("channel_not_found"));
        }
        other => panic!("expected send error, got {other:?}"),
    }
    assert_eq!(channel.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn noop_mode_drains_without_sending() {
    let channel = FakeChannel::new(Mode::Deliver);
    let input: &'static [u8] = b"a\nb\n";
    let (_sig_tx, sig_rx) = mpsc::channel(4);

    let outcome = controller(Arc::clone(&channel), true)
        .run(ReaderSource::new(input, false), sig_rx)
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::Drained);
    assert_eq!(channel.attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn lines_arriving_over_time_are_batched_per_interval() {
    let channel = FakeChannel::new(Mode::Deliver);
    let (line_tx, line_rx) = mpsc::channel(16);
    let (_sig_tx, sig_rx) = mpsc::channel(4);

    tokio::spawn(async move {
        for i in 0..4 {
            line_tx.send(format!("tick {i}")).await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
        // line_tx dropped here: end of input.
    });

    let outcome = controller(Arc::clone(&channel), false)
        .run(line_rx, sig_rx)
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::Drained);
    assert_eq!(channel.lines(), vec!["tick 0", "tick 1", "tick 2", "tick 3"]);
    assert!(channel.delivered.lock().unwrap().len() > 1);
}
