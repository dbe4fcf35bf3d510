//! Buffered, multi-listener line streams over child output (non-UTF8-safe).
//!
//! Dev servers (and the node tooling under them) can emit non-UTF8 bytes on
//! stdout/stderr. Using `BufReader::lines()` would terminate the reader on
//! invalid UTF-8, so lines are read as bytes and decoded lossily.
//!
//! A [`StreamWatcher`] owns one reader task. Every line is appended to a
//! buffer held in a `watch` channel, and every subscriber walks that buffer
//! with its own cursor. Late subscribers therefore replay full history before
//! seeing live lines, and no subscriber can steal a line from another.

use regex::Regex;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Errors from [`StreamWatcher::wait_for_match`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WatchError {
    /// Neither a match nor end of stream within the timeout.
    #[error("no matching line within {0:?}")]
    Timeout(Duration),

    /// The stream closed before a matching line was read.
    #[error("stream closed before a matching line was read")]
    EndOfStream,
}

/// Lines read so far and whether the source has closed.
#[derive(Debug, Default)]
struct LineBuffer {
    lines: Vec<String>,
    closed: bool,
}

/// Watches one output stream of a child process.
///
/// Cloning is cheap and every clone observes the same buffer.
///
/// The buffer keeps every line for the lifetime of the stream so that late
/// subscribers see full history. It is not capped: a long-running dev server
/// that rebuilds often grows it without bound.
#[derive(Debug, Clone)]
pub struct StreamWatcher {
    label: &'static str,
    state: watch::Receiver<LineBuffer>,
}

impl StreamWatcher {
    /// Start reading `source` on a background task.
    ///
    /// `label` names the stream in log output (e.g. "stdout").
    pub fn spawn<R>(source: R, label: &'static str) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = watch::channel(LineBuffer::default());
        tokio::spawn(read_lines(source, label, tx));
        Self { label, state: rx }
    }

    /// Name of the watched stream.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Subscribe to the stream from its first line.
    ///
    /// The subscription yields buffered lines first, then live lines in
    /// arrival order, then `None` once the source has closed.
    pub fn subscribe(&self) -> LineSubscription {
        LineSubscription {
            state: self.state.clone(),
            cursor: 0,
        }
    }

    /// Invoke `on_line` for every line and `on_closed` once the stream ends.
    ///
    /// Runs on its own task; the returned handle can be awaited or dropped.
    pub fn listen<F, C>(&self, mut on_line: F, on_closed: C) -> JoinHandle<()>
    where
        F: FnMut(&str) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let mut lines = self.subscribe();
        tokio::spawn(async move {
            while let Some(line) = lines.next_line().await {
                on_line(&line);
            }
            on_closed();
        })
    }

    /// Wait for the first line matching `pattern`, buffered lines included.
    ///
    /// Returns the matching line, or [`WatchError::EndOfStream`] if the
    /// source closes first. There is no time limit; callers that need one
    /// race this against a timer or use [`StreamWatcher::wait_for_match`].
    pub async fn next_match(&self, pattern: &Regex) -> Result<String, WatchError> {
        let mut lines = self.subscribe();
        while let Some(line) = lines.next_line().await {
            if pattern.is_match(&line) {
                return Ok(line);
            }
        }
        Err(WatchError::EndOfStream)
    }

    /// Like [`StreamWatcher::next_match`], bounded by `timeout`.
    ///
    /// Fails with [`WatchError::Timeout`] if neither a match nor end of
    /// stream happens in time.
    pub async fn wait_for_match(
        &self,
        pattern: &Regex,
        timeout: Duration,
    ) -> Result<String, WatchError> {
        tokio::time::timeout(timeout, self.next_match(pattern))
            .await
            .unwrap_or(Err(WatchError::Timeout(timeout)))
    }

    /// Wait until the source has closed, for at most `timeout`.
    ///
    /// Returns whether the stream is closed.
    pub async fn wait_closed(&self, timeout: Duration) -> bool {
        let mut state = self.state.clone();
        let closed = tokio::time::timeout(timeout, state.wait_for(|buf| buf.closed)).await;
        matches!(closed, Ok(Ok(_)))
    }

    /// All lines read so far, each terminated by a newline.
    pub fn read_as_string(&self) -> String {
        let buf = self.state.borrow();
        buf.lines.iter().fold(String::new(), |mut out, line| {
            out.push_str(line);
            out.push('\n');
            out
        })
    }

    /// Snapshot of the lines read so far.
    pub fn lines(&self) -> Vec<String> {
        self.state.borrow().lines.clone()
    }

    /// Whether the source has reached end of stream.
    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }
}

/// A cursor over a [`StreamWatcher`]'s lines.
#[derive(Debug)]
pub struct LineSubscription {
    state: watch::Receiver<LineBuffer>,
    cursor: usize,
}

impl LineSubscription {
    /// Next line, or `None` once the stream has closed and been drained.
    pub async fn next_line(&mut self) -> Option<String> {
        let mut writer_gone = false;
        loop {
            {
                let buf = self.state.borrow_and_update();
                if let Some(line) = buf.lines.get(self.cursor) {
                    self.cursor += 1;
                    return Some(line.clone());
                }
                if buf.closed || writer_gone {
                    return None;
                }
            }
            // Err means the reader task is gone; drain once more, then stop.
            writer_gone = self.state.changed().await.is_err();
        }
    }
}

async fn read_lines<R>(source: R, label: &'static str, tx: watch::Sender<LineBuffer>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(source);
    let mut buf: Vec<u8> = Vec::with_capacity(1024);

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break, // EOF
            Ok(_) => {
                // Trim trailing newline(s)
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }

                let line = String::from_utf8_lossy(&buf).into_owned();
                tx.send_modify(|state| state.lines.push(line));
            }
            Err(e) => {
                debug!(stream = %label, error = %e, "stream reader exiting due to read error");
                break;
            }
        }
    }

    tx.send_modify(|state| state.closed = true);
    debug!(stream = %label, "stream reader task exiting");
}
