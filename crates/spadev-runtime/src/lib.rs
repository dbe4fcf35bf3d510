//! Process runtime and readiness detection for spadev.
//!
//! Launches a front-end dev server script, watches its output for the
//! `Local:   http://localhost:<port>/` readiness line and exposes the resulting
//! address through [`DevServerAttachment`].
#![deny(unsafe_code)]

mod attach;
pub mod process;
mod readiness;
mod timeout;

// Re-export the orchestrator entry points
pub use attach::{DevServerAttachment, attach, attach_with_sink, target_url};

// Re-export readiness detection
pub use readiness::{ReadinessDetector, ReadyServer, readiness_line, readiness_pattern};

// Re-export the timeout race
pub use timeout::with_timeout;

// Re-export process primitives
pub use process::{
    LineSubscription, ScriptProcess, StreamWatcher, TracingLogSink, WatchError,
    find_available_port, run_script,
};
