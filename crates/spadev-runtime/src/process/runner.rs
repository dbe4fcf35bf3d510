//! Spawning the dev server script as a child process.
//!
//! [`run_script`] starts the process and returns a [`ScriptProcess`] that
//! exposes stdout and stderr as two independent [`StreamWatcher`]s plus an
//! exit signal. A supervisor task owns the `Child`; it publishes the exit
//! status when the process ends on its own and performs the graceful
//! shutdown when asked to.

use spadev_core::{DevServerError, DevServerResult, LaunchCommand};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::shutdown::shutdown_child;
use super::stream::StreamWatcher;

/// Handle to a running (or finished) dev server process.
///
/// Dropping the handle requests shutdown of the process; call
/// [`ScriptProcess::shutdown`] to wait for it.
#[derive(Debug)]
pub struct ScriptProcess {
    command: LaunchCommand,
    working_dir: PathBuf,
    pid: Option<u32>,
    stdout: StreamWatcher,
    stderr: StreamWatcher,
    exit: watch::Receiver<Option<ExitStatus>>,
    cancel: CancellationToken,
}

impl ScriptProcess {
    /// The command line that was spawned.
    pub fn command(&self) -> &LaunchCommand {
        &self.command
    }

    /// Directory the process runs in.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// OS process ID, if the OS reported one.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Watcher over the child's standard output.
    pub fn stdout(&self) -> &StreamWatcher {
        &self.stdout
    }

    /// Watcher over the child's standard error.
    pub fn stderr(&self) -> &StreamWatcher {
        &self.stderr
    }

    /// Exit status, if the process has exited.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        *self.exit.borrow()
    }

    /// Whether the process has exited (or its supervisor is gone).
    pub fn has_exited(&self) -> bool {
        self.exit.borrow().is_some() || self.exit.has_changed().is_err()
    }

    /// Wait for the process to exit on its own.
    ///
    /// Returns `None` if the exit status could not be collected.
    pub async fn wait_exit(&self) -> Option<ExitStatus> {
        let mut exit = self.exit.clone();
        match exit.wait_for(Option::is_some).await {
            Ok(status) => *status,
            Err(_) => None,
        }
    }

    /// Stop the process (SIGTERM → SIGKILL) and wait until it is reaped.
    ///
    /// Safe to call on a process that already exited.
    pub async fn shutdown(&self) -> Option<ExitStatus> {
        self.cancel.cancel();
        self.wait_exit().await
    }
}

impl Drop for ScriptProcess {
    fn drop(&mut self) {
        // Supervisor performs the actual teardown; kill_on_drop backs it up
        // if the runtime is already gone.
        self.cancel.cancel();
    }
}

/// Spawn `command` inside `working_dir` with extra `env` variables.
///
/// Does not wait for the process to do anything. Fails fast with
/// [`DevServerError::SpawnFailed`] if the directory does not exist, the
/// program cannot be found on `PATH`, or the OS refuses to spawn it.
///
/// Must be called from within a Tokio runtime.
pub fn run_script(
    working_dir: &Path,
    command: &LaunchCommand,
    env: &BTreeMap<String, String>,
) -> DevServerResult<ScriptProcess> {
    if !working_dir.is_dir() {
        return Err(DevServerError::spawn_failed(
            command,
            format!(
                "working directory does not exist: {}",
                working_dir.display()
            ),
        ));
    }

    let program = resolve_program(working_dir, command, env)?;
    debug!(program = %program.display(), cwd = %working_dir.display(), "Resolved dev server program");

    let mut cmd = Command::new(&program);
    cmd.args(&command.args)
        .current_dir(working_dir)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Own process group so shutdown reaches npm's grandchildren too
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd
        .spawn()
        .map_err(|e| DevServerError::spawn_failed(command, e.to_string()))?;
    let pid = child.id();

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| DevServerError::spawn_failed(command, "stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| DevServerError::spawn_failed(command, "stderr was not captured"))?;

    let (exit_tx, exit_rx) = watch::channel(None);
    let cancel = CancellationToken::new();
    tokio::spawn(supervise(child, cancel.clone(), exit_tx));

    debug!(pid = ?pid, command = %command, "Spawned dev server process");

    Ok(ScriptProcess {
        command: command.clone(),
        working_dir: working_dir.to_path_buf(),
        pid,
        stdout: StreamWatcher::spawn(stdout, "stdout"),
        stderr: StreamWatcher::spawn(stderr, "stderr"),
        exit: exit_rx,
        cancel,
    })
}

/// Locate the program the way a shell would, honouring an overridden `PATH`.
fn resolve_program(
    working_dir: &Path,
    command: &LaunchCommand,
    env: &BTreeMap<String, String>,
) -> DevServerResult<PathBuf> {
    let search_path = env
        .get("PATH")
        .map(OsString::from)
        .or_else(|| std::env::var_os("PATH"));

    which::which_in(&command.program, search_path, working_dir).map_err(|e| {
        DevServerError::spawn_failed(
            command,
            format!("executable '{}' not found: {e}", command.program),
        )
    })
}

async fn supervise(
    mut child: Child,
    cancel: CancellationToken,
    exit_tx: watch::Sender<Option<ExitStatus>>,
) {
    let exited = tokio::select! {
        status = child.wait() => Some(status),
        () = cancel.cancelled() => None,
    };

    let status = match exited {
        Some(status) => status,
        None => {
            debug!(pid = ?child.id(), "Shutting down dev server process");
            shutdown_child(child).await
        }
    };

    match status {
        Ok(status) => {
            debug!(%status, "Dev server process exited");
            exit_tx.send_replace(Some(status));
        }
        Err(e) => {
            // Dropping the sender still wakes waiters
            warn!(error = %e, "Failed to collect dev server exit status");
        }
    }
}
