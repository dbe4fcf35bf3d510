//! Graceful shutdown for dev server processes with SIGTERM → SIGKILL escalation.
//!
//! npm runs the actual dev server as a grandchild, so on Unix the child is
//! spawned as the leader of its own process group and signals go to the whole
//! group.

use std::io;
use std::process::ExitStatus;

use tokio::process::Child;

#[cfg(unix)]
use std::time::Duration;
#[cfg(unix)]
use tokio::time::timeout;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Grace period between SIGTERM and SIGKILL.
#[cfg(unix)]
const TERM_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Gracefully shut down a child process group, escalating to SIGKILL if needed.
///
/// # Strategy
/// 1. Send SIGTERM to the process group and wait up to 5 seconds
/// 2. If still running, send SIGKILL to the group
/// 3. Wait for the child to be reaped (required to avoid zombies)
///
/// # Platform behavior
/// - Unix: Uses nix `killpg` for both signals
/// - Windows: Immediately calls `.kill()` (no graceful shutdown available)
pub async fn shutdown_child(mut child: Child) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        shutdown_unix(&mut child).await
    }

    #[cfg(not(unix))]
    {
        shutdown_windows(&mut child).await
    }
}

#[cfg(unix)]
async fn shutdown_unix(child: &mut Child) -> io::Result<ExitStatus> {
    let Some(pid) = child.id() else {
        // Already reaped
        return child.wait().await;
    };
    let group = Pid::from_raw(i32::try_from(pid).map_err(io::Error::other)?);

    // Phase 1: SIGTERM with grace period
    if let Err(e) = signal::killpg(group, Signal::SIGTERM) {
        // Group may have already exited
        if e == nix::errno::Errno::ESRCH {
            return child.wait().await;
        }
        return Err(io::Error::other(e));
    }

    if let Ok(result) = timeout(TERM_GRACE_PERIOD, child.wait()).await {
        return result;
    }

    // Phase 2: SIGKILL for anything left in the group
    match signal::killpg(group, Signal::SIGKILL) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
        Err(e) => return Err(io::Error::other(e)),
    }

    // Phase 3: Wait for reaping (should be fast after SIGKILL)
    child.wait().await
}

#[cfg(not(unix))]
async fn shutdown_windows(child: &mut Child) -> io::Result<ExitStatus> {
    // Windows has no SIGTERM equivalent - terminate immediately
    child.kill().await?;
    child.wait().await
}
