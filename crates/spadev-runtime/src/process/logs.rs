//! Forwarding of dev server output into the log.
//!
//! Dev servers colour their output for terminals. Lines are stripped of ANSI
//! colour sequences before they reach a sink so log files stay readable.

use spadev_core::{OutputLogSinkPort, OutputStream};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::runner::ScriptProcess;
use super::stream::StreamWatcher;

/// Log sink that writes dev server output through `tracing`.
///
/// stdout lines are logged at `info`, stderr lines at `warn`.
#[derive(Debug, Clone, Default)]
pub struct TracingLogSink;

impl OutputLogSinkPort for TracingLogSink {
    fn append(&self, port: u16, stream: OutputStream, line: String) {
        match stream {
            OutputStream::Stdout => info!(port = %port, stream = %stream, "{}", line),
            OutputStream::Stderr => warn!(port = %port, stream = %stream, "{}", line),
        }
    }
}

/// Forward both output streams of `process` to `sink`.
///
/// Returns the two listener tasks; they finish when the streams close.
pub fn forward_output(
    process: &ScriptProcess,
    port: u16,
    sink: &Arc<dyn OutputLogSinkPort>,
) -> [JoinHandle<()>; 2] {
    [
        forward_stream(process.stdout(), port, OutputStream::Stdout, Arc::clone(sink)),
        forward_stream(process.stderr(), port, OutputStream::Stderr, Arc::clone(sink)),
    ]
}

fn forward_stream(
    watcher: &StreamWatcher,
    port: u16,
    stream: OutputStream,
    sink: Arc<dyn OutputLogSinkPort>,
) -> JoinHandle<()> {
    watcher.listen(
        move |line| sink.append(port, stream, strip_ansi_colors(line)),
        move || debug!(port = %port, stream = %stream, "Dev server output closed"),
    )
}

/// Remove SGR colour sequences (`ESC [ <digits/semicolons> m`) from `line`.
///
/// Other escape sequences are left untouched.
pub fn strip_ansi_colors(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(start) = rest.find('\x1b') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match sgr_len(candidate) {
            Some(len) => rest = &candidate[len..],
            None => {
                out.push('\x1b');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Length of the SGR sequence at the start of `s`, if there is one.
fn sgr_len(s: &str) -> Option<usize> {
    let body = s.strip_prefix("\x1b[")?;
    let params = body
        .bytes()
        .take_while(|b| b.is_ascii_digit() || *b == b';')
        .count();
    (body.as_bytes().get(params) == Some(&b'm')).then_some(2 + params + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::io::{AsyncWriteExt, duplex};

    #[derive(Default)]
    struct RecordingSink {
        lines: Mutex<Vec<(OutputStream, String)>>,
    }

    impl OutputLogSinkPort for RecordingSink {
        fn append(&self, _port: u16, stream: OutputStream, line: String) {
            self.lines.lock().unwrap().push((stream, line));
        }
    }

    #[test]
    fn test_strip_ansi_colors() {
        assert_eq!(
            strip_ansi_colors("\x1b[32m  ➜\x1b[39m  \x1b[1mLocal\x1b[22m:   http://localhost:5173/"),
            "  ➜  Local:   http://localhost:5173/"
        );
        assert_eq!(strip_ansi_colors("plain text"), "plain text");
        assert_eq!(strip_ansi_colors("\x1b[0;1;31merror\x1b[m"), "error");
    }

    #[test]
    fn test_non_color_escapes_are_kept() {
        assert_eq!(strip_ansi_colors("a\x1b[2Kb"), "a\x1b[2Kb");
        assert_eq!(strip_ansi_colors("trailing \x1b"), "trailing \x1b");
    }

    #[tokio::test]
    async fn test_forward_stream_strips_and_tags_lines() {
        let (mut tx, rx) = duplex(256);
        let watcher = StreamWatcher::spawn(rx, "stderr");
        let recorder = Arc::new(RecordingSink::default());
        let sink: Arc<dyn OutputLogSinkPort> = recorder.clone();

        let handle = forward_stream(&watcher, 5173, OutputStream::Stderr, sink);
        tx.write_all(b"\x1b[31mfailed\x1b[0m\n").await.unwrap();
        drop(tx);
        handle.await.unwrap();

        let lines = recorder.lines.lock().unwrap();
        assert_eq!(*lines, vec![(OutputStream::Stderr, "failed".to_string())]);
    }
}
