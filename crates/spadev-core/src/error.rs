//! Error types for dev server launches.
//!
//! Every failure of a launch attempt is reported as a [`DevServerError`].
//! The type is `Clone` because a single launch outcome is shared by every
//! caller that asks for the target address.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while launching and attaching to a dev server.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DevServerError {
    // === Validation ===
    /// A required option was empty.
    #[error("Invalid argument '{name}': cannot be null or empty")]
    InvalidArgument { name: &'static str },

    /// The startup timeout was zero.
    #[error("Invalid startup timeout: must be greater than zero")]
    ZeroTimeout,

    // === Launch ===
    /// No local port could be obtained.
    #[error("Failed to allocate a local port: {0}")]
    PortAllocation(String),

    /// The child process could not be started at all.
    #[error("Failed to start '{command}': {reason}")]
    SpawnFailed { command: String, reason: String },

    // === Readiness ===
    /// The script exited before printing the readiness line.
    #[error(
        "The npm script '{script}' exited without indicating that the dev server was \
         listening for requests. The error output was: {stderr}"
    )]
    ExitedPrematurely { script: String, stderr: String },

    /// The startup deadline passed before the server became ready.
    #[error(
        "The dev server did not start listening for requests within the timeout period of {}. \
         Check the log output for error information.",
        format_timeout(.timeout)
    )]
    Timeout { timeout: Duration },

    // === Other ===
    /// The launch task itself failed (panicked or was aborted).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DevServerError {
    /// Create a `SpawnFailed` error for the given command line.
    pub fn spawn_failed(command: impl ToString, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            command: command.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an `Internal` error from any displayable error.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result type alias for dev server operations.
pub type DevServerResult<T> = Result<T, DevServerError>;

/// Render a timeout for user-facing messages.
///
/// Whole seconds render as seconds; anything else falls back to milliseconds
/// so that short timeouts do not collapse to "0 seconds".
pub fn format_timeout(timeout: &Duration) -> String {
    if timeout.subsec_nanos() == 0 && timeout.as_secs() > 0 {
        match timeout.as_secs() {
            1 => "1 second".to_string(),
            secs => format!("{secs} seconds"),
        }
    } else {
        format!("{} milliseconds", timeout.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_uses_seconds() {
        let err = DevServerError::Timeout {
            timeout: Duration::from_secs(120),
        };
        let msg = err.to_string();
        assert!(msg.contains("within the timeout period of 120 seconds"));
        assert!(msg.contains("Check the log output"));
    }

    #[test]
    fn test_sub_second_timeout_uses_milliseconds() {
        assert_eq!(format_timeout(&Duration::from_millis(50)), "50 milliseconds");
        assert_eq!(format_timeout(&Duration::from_millis(1500)), "1500 milliseconds");
        assert_eq!(format_timeout(&Duration::from_secs(1)), "1 second");
    }

    #[test]
    fn test_exited_prematurely_embeds_stderr_verbatim() {
        let err = DevServerError::ExitedPrematurely {
            script: "serve".to_string(),
            stderr: "Error: port in use\n".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'serve'"));
        assert!(msg.ends_with("Error: port in use\n"));
    }

    #[test]
    fn test_invalid_argument_names_the_option() {
        let err = DevServerError::InvalidArgument {
            name: "script_name",
        };
        assert!(err.to_string().contains("script_name"));
    }
}
