use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use slackcat_channels::{Channel, Destination, MessageFormat, OutboundMessage};
use slackcat_core::BatchFormat;
use tracing::{debug, info};

use crate::error::{Result, StreamError};
use crate::queue::StreamQueue;

/// Flushes the queue on a fixed interval and posts each batch as one message.
pub struct BatchPoster {
    queue: Arc<StreamQueue>,
    channel: Arc<dyn Channel>,
    destination: Destination,
    format: BatchFormat,
    noop: bool,
    interval: Duration,
}

impl BatchPoster {
    pub fn new(
        queue: Arc<StreamQueue>,
        channel: Arc<dyn Channel>,
        destination: Destination,
        format: BatchFormat,
        noop: bool,
        interval: Duration,
    ) -> Self {
        Self {
            queue,
            channel,
            destination,
            format,
            noop,
            interval,
        }
    }

    /// Post batches forever. Only returns when a send fails.
    pub async fn run(&self) -> Result<Infallible> {
        loop {
            self.post_once().await?;
            tokio::time::sleep(self.interval).await;
        }
    }

    /// One flush/post cycle. Returns the number of lines handled.
    ///
    /// On a failed send the batch stays in flight (not acknowledged) and the
    /// error is returned for the caller to treat as fatal.
    pub async fn post_once(&self) -> Result<usize> {
        if self.queue.is_empty() {
            return Ok(0);
        }

        let lines = self.queue.flush();
        let count = lines.len();

        if self.noop {
            info!(
                lines = count,
                "skipped posting of {count} message lines to {}", self.destination
            );
            self.queue.ack();
            return Ok(count);
        }

        let (content, format) = render_batch(&lines, self.format);
        if content.trim().is_empty() {
            // Slack rejects blank text. Only reachable in plain format.
            debug!(lines = count, "dropping blank batch");
            self.queue.ack();
            return Ok(count);
        }

        let msg = OutboundMessage::new(self.destination.id.clone(), content).with_format(format);
        self.channel
            .send(&msg)
            .await
            .map_err(|source| StreamError::Send {
                destination: self.destination.name.clone(),
                source,
            })?;
        self.queue.ack();

        info!(
            lines = count,
            "posted {count} message lines to {}", self.destination
        );
        Ok(count)
    }
}

/// Join lines with `\n` and apply the batch formatting policy.
pub fn render_batch(lines: &[String], format: BatchFormat) -> (String, MessageFormat) {
    let body = lines.join("\n");
    match format {
        BatchFormat::Code => (format!("```{body}```"), MessageFormat::Markdown),
        BatchFormat::Plain => (body, MessageFormat::PlainText),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use slackcat_channels::{ChannelError, FileUpload};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<OutboundMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl Channel for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }
        async fn resolve(&self, name: &str) -> std::result::Result<Destination, ChannelError> {
            Ok(Destination {
                name: name.to_string(),
                id: name.to_uppercase(),
            })
        }
        async fn send(&self, msg: &OutboundMessage) -> std::result::Result<(), ChannelError> {
            if self.fail {
                return Err(ChannelError::SendFailed("boom".to_string()));
            }
            self.sent.lock().unwrap().push(msg.clone());
            Ok(())
        }
        async fn upload(&self, _file: &FileUpload) -> std::result::Result<(), ChannelError> {
            Ok(())
        }
    }

    fn poster(channel: Arc<Recorder>, format: BatchFormat, noop: bool) -> (BatchPoster, Arc<StreamQueue>) {
        let queue = Arc::new(StreamQueue::new());
        let dest = Destination {
            name: "ops".to_string(),
            id: "C123".to_string(),
        };
        let p = BatchPoster::new(
            Arc::clone(&queue),
            channel,
            dest,
            format,
            noop,
            Duration::from_secs(3),
        );
        (p, queue)
    }

    #[test]
    fn code_format_wraps_in_fence() {
        let lines = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            render_batch(&lines, BatchFormat::Code),
            ("```a\nb```".to_string(), MessageFormat::Markdown)
        );
        assert_eq!(
            render_batch(&lines, BatchFormat::Plain),
            ("a\nb".to_string(), MessageFormat::PlainText)
        );
    }

    #[tokio::test]
    async fn empty_queue_sends_nothing() {
        let rec = Arc::new(Recorder::default());
        let (p, _queue) = poster(Arc::clone(&rec), BatchFormat::Code, false);
        assert_eq!(p.post_once().await.unwrap(), 0);
        assert!(rec.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_is_posted_and_acknowledged() {
        let rec = Arc::new(Recorder::default());
        let (p, queue) = poster(Arc::clone(&rec), BatchFormat::Code, false);
        queue.add("first");
        queue.add("second");

        assert_eq!(p.post_once().await.unwrap(), 2);
        assert!(queue.is_empty());

        let sent = rec.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].channel_id, "C123");
        assert_eq!(sent[0].content, "```first\nsecond```");
        assert_eq!(sent[0].format, MessageFormat::Markdown);
    }

    #[tokio::test]
    async fn noop_mode_never_sends_and_never_leaks_in_flight() {
        let rec = Arc::new(Recorder::default());
        let (p, queue) = poster(Arc::clone(&rec), BatchFormat::Code, true);
        for cycle in 0..5 {
            queue.add(format!("line {cycle}"));
            queue.add(format!("line {cycle}b"));
            assert_eq!(p.post_once().await.unwrap(), 2);
            assert_eq!(queue.in_flight_len(), 0);
            assert!(queue.is_empty());
        }
        assert!(rec.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_send_keeps_batch_in_flight() {
        let rec = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let (p, queue) = poster(rec, BatchFormat::Plain, false);
        queue.add("keep me");

        let err = p.post_once().await.unwrap_err();
        assert!(matches!(err, StreamError::Send { ref destination, .. } if destination == "ops"));
        assert_eq!(queue.in_flight_len(), 1);
        assert!(!queue.is_empty());
    }

    #[tokio::test]
    async fn blank_plain_batch_is_dropped_without_sending() {
        let rec = Arc::new(Recorder::default());
        let (p, queue) = poster(Arc::clone(&rec), BatchFormat::Plain, false);
        queue.add("");
        queue.add("   ");
        assert_eq!(p.post_once().await.unwrap(), 2);
        assert!(queue.is_empty());
        assert!(rec.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn whitespace_lines_in_code_format_are_delivered() {
        let rec = Arc::new(Recorder::default());
        let (p, queue) = poster(Arc::clone(&rec), BatchFormat::Code, false);
        queue.add("    ");
        queue.add("\t");
        assert_eq!(p.post_once().await.unwrap(), 2);
        assert!(queue.is_empty());

        let sent = rec.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].content, "```    \n\t```");
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_on_first_failure() {
        let rec = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let (p, queue) = poster(rec, BatchFormat::Code, false);
        queue.add("x");
        assert!(p.run().await.is_err());
    }
}
