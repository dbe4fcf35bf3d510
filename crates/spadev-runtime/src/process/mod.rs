//! Process management infrastructure for dev server launches.
//!
//! # Structure
//!
//! - `find_available_port` - OS-assigned loopback port
//! - `StreamWatcher` - buffered, multi-listener line stream over child output
//! - `run_script` / `ScriptProcess` - spawning and owning the child
//! - `shutdown_child` - graceful SIGTERM → SIGKILL teardown
//! - `forward_output` - child output into the log, colour codes stripped

mod logs;
mod ports;
mod runner;
mod shutdown;
mod stream;

pub use logs::{TracingLogSink, forward_output, strip_ansi_colors};
pub use ports::{find_available_port, is_port_available};
pub use runner::{ScriptProcess, run_script};
pub use shutdown::shutdown_child;
pub use stream::{LineSubscription, StreamWatcher, WatchError};
