//! Core domain types and port definitions for spadev.
//!
//! spadev launches a front-end development server (an npm script such as
//! `serve` or `dev`) as a child process, waits until it prints its readiness
//! line and hands the resulting `http://localhost:<port>` address to a
//! request-forwarding collaborator.
//!
//! This crate holds the pieces every adapter shares:
//!
//! - [`DevServerOptions`] / [`ScriptLauncher`] - what to launch and how
//! - [`DevServerError`] - the single failure type surfaced to callers
//! - [`ports`] - traits for the proxy collaborator and output log sinks
//!
//! Process spawning, stream watching and readiness detection live in
//! `spadev-runtime`.

pub mod config;
pub mod error;
pub mod ports;

pub use config::{
    DEFAULT_STARTUP_TIMEOUT_SECS, DevServerOptions, LAUNCH_HOST, LaunchCommand, ScriptLauncher,
    script_arguments,
};
pub use error::{DevServerError, DevServerResult, format_timeout};
pub use ports::{OutputLogSinkPort, OutputStream, ProxyTargetProvider, ProxyTargetRegistrar};
