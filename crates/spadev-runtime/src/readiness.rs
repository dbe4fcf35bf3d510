//! Readiness detection for a freshly launched dev server.
//!
//! The dev server signals readiness by printing
//! `Local:   http://localhost:<port>/` on stdout. The detector allocates the
//! port, launches the script with that port, and waits for exactly that
//! line. If stdout closes first, the captured stderr becomes the error.

use regex::{Regex, RegexBuilder};
use spadev_core::{DevServerError, DevServerOptions, DevServerResult, OutputLogSinkPort};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::process::{ScriptProcess, find_available_port, forward_output, run_script};

/// How long to wait for stderr to drain after stdout has closed.
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Upper bound on the compiled readiness pattern.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// The exact line a dev server prints once it accepts connections.
pub fn readiness_line(port: u16) -> String {
    format!("Local:   http://localhost:{port}/")
}

/// Compile the readiness line for `port` as a literal, case-sensitive pattern.
pub fn readiness_pattern(port: u16) -> DevServerResult<Regex> {
    RegexBuilder::new(&regex::escape(&readiness_line(port)))
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .map_err(DevServerError::internal)
}

/// A dev server that printed its readiness line.
#[derive(Debug)]
pub struct ReadyServer {
    /// Port the server is listening on.
    pub port: u16,
    /// The running child process.
    pub process: ScriptProcess,
}

/// Starts a dev server script and waits until it is listening.
pub struct ReadinessDetector {
    options: DevServerOptions,
    log_sink: Option<Arc<dyn OutputLogSinkPort>>,
}

impl ReadinessDetector {
    /// Create a detector for the given options.
    pub fn new(options: DevServerOptions) -> Self {
        Self {
            options,
            log_sink: None,
        }
    }

    /// Forward the child's output to `sink` while it runs.
    #[must_use]
    pub fn with_log_sink(mut self, sink: Option<Arc<dyn OutputLogSinkPort>>) -> Self {
        self.log_sink = sink;
        self
    }

    /// Allocate a port, spawn the script and wait for its readiness line.
    ///
    /// Not bounded in time: it ends on the readiness line or when stdout
    /// closes. Race it with [`crate::with_timeout`] to give up waiting.
    pub async fn start(&self) -> DevServerResult<ReadyServer> {
        let (port, process) = self.spawn()?;
        self.wait_until_ready(port, &process).await?;
        Ok(ReadyServer { port, process })
    }

    /// Allocate a port and spawn the script on it without waiting.
    pub fn spawn(&self) -> DevServerResult<(u16, ScriptProcess)> {
        let script = &self.options.script_name;
        let port = find_available_port()?;
        info!(port = %port, script = %script, "Starting dev server on port {port}...");

        let command = self.options.launcher.command_for(script, port);
        let process = run_script(&self.options.source_path, &command, &self.options.env)
            .inspect_err(|e| warn!(port = %port, error = %e, "Dev server failed to spawn"))?;

        if let Some(sink) = &self.log_sink {
            forward_output(&process, port, sink);
        }

        debug!(pid = ?process.pid(), command = %command, "Waiting for readiness line");
        Ok((port, process))
    }

    /// Wait until `process` prints the readiness line for `port`.
    ///
    /// Fails with [`DevServerError::ExitedPrematurely`] if stdout closes
    /// first, carrying whatever the script wrote to stderr.
    pub async fn wait_until_ready(&self, port: u16, process: &ScriptProcess) -> DevServerResult<()> {
        let pattern = readiness_pattern(port)?;

        match process.stdout().next_match(&pattern).await {
            Ok(line) => {
                debug!(line = %line, "Matched readiness line");
                info!(port = %port, "Dev server is running");
                Ok(())
            }
            Err(_) => {
                // stdout and stderr close independently; let stderr catch up
                if !process.stderr().wait_closed(STDERR_DRAIN_TIMEOUT).await {
                    debug!("stderr still open after stdout closed");
                }
                let err = DevServerError::ExitedPrematurely {
                    script: self.options.script_name.clone(),
                    stderr: process.stderr().read_as_string(),
                };
                warn!(port = %port, error = %err, "Dev server did not become ready");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_line_format() {
        assert_eq!(readiness_line(5173), "Local:   http://localhost:5173/");
    }

    #[test]
    fn test_pattern_is_literal() {
        let pattern = readiness_pattern(8080).unwrap();
        assert!(pattern.is_match("  App running at:\n  - Local:   http://localhost:8080/ "));
        assert!(!pattern.is_match("Local:   http://localhostX8080/"));
        assert!(!pattern.is_match("Local:   http://localhost:80801/"));
    }

    #[test]
    fn test_pattern_requires_exact_port_and_spacing() {
        let pattern = readiness_pattern(8080).unwrap();
        assert!(!pattern.is_match("Local:   http://localhost:8081/"));
        assert!(!pattern.is_match("Local: http://localhost:8080/"));
        assert!(!pattern.is_match("Local:   http://localhost:8080"));
        assert!(!pattern.is_match("LOCAL:   http://localhost:8080/"));
    }
}
