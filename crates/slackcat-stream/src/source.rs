use std::io::Write;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A one-pass sequence of input lines. `None` means input is exhausted.
#[async_trait]
pub trait LineSource: Send {
    async fn next_line(&mut self) -> Option<String>;
}

/// Line source over any buffered async reader (stdin in production).
///
/// Input is split on `\n`; a trailing `\r` is dropped and invalid UTF-8 is
/// replaced rather than ending the stream. With `tee` each line is echoed to
/// stdout as it is read.
pub struct ReaderSource<R> {
    reader: R,
    tee: Option<Box<dyn Write + Send>>,
    buf: Vec<u8>,
}

impl<R> ReaderSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R, tee: bool) -> Self {
        let out: Option<Box<dyn Write + Send>> = if tee {
            Some(Box::new(std::io::stdout()))
        } else {
            None
        };
        Self {
            reader,
            tee: out,
            buf: Vec::new(),
        }
    }

    /// Echo every line to `out` instead of stdout.
    pub fn tee_to(reader: R, out: impl Write + Send + 'static) -> Self {
        Self {
            reader,
            tee: Some(Box::new(out)),
            buf: Vec::new(),
        }
    }
}

impl ReaderSource<tokio::io::BufReader<tokio::io::Stdin>> {
    pub fn stdin(tee: bool) -> Self {
        Self::new(tokio::io::BufReader::new(tokio::io::stdin()), tee)
    }
}

#[async_trait]
impl<R> LineSource for ReaderSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_line(&mut self) -> Option<String> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf).await {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                }
                if self.buf.last() == Some(&b'\r') {
                    self.buf.pop();
                }
                let line = String::from_utf8_lossy(&self.buf).into_owned();
                if let Some(out) = self.tee.as_mut() {
                    if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
                        debug!(error = %e, "tee write failed");
                    }
                }
                Some(line)
            }
            Err(e) => {
                warn!(error = %e, "input read failed, treating as end of input");
                None
            }
        }
    }
}

#[async_trait]
impl LineSource for mpsc::Receiver<String> {
    async fn next_line(&mut self) -> Option<String> {
        self.recv().await
    }
}
