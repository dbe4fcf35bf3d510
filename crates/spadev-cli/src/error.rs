//! CLI-specific error types and mappings.
//!
//! This module maps `DevServerError` to exit codes and user-facing messages.

use spadev_core::DevServerError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument error not caught by clap.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// Dev server launch error.
    #[error(transparent)]
    DevServer(#[from] DevServerError),

    /// IO error (signal handling and similar).
    #[error("IO error: {0}")]
    Io(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow sysexits.h where one fits:
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 70: Internal software error
    /// - 71: OS error (spawn failed, no port)
    /// - 74: IO error
    /// - 75: Temporary failure (startup timeout)
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Arguments(_) => 2,
            Self::Io(_) => 74,
            Self::DevServer(err) => match err {
                DevServerError::InvalidArgument { .. } | DevServerError::ZeroTimeout => 2,
                DevServerError::PortAllocation(_) | DevServerError::SpawnFailed { .. } => 71,
                DevServerError::Timeout { .. } => 75,
                DevServerError::ExitedPrematurely { .. } | DevServerError::Internal(_) => 70,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Arguments("x".into()).exit_code(), 2);
        let timeout: CliError = DevServerError::Timeout {
            timeout: Duration::from_secs(1),
        }
        .into();
        assert_eq!(timeout.exit_code(), 75);
        let spawn: CliError = DevServerError::spawn_failed("npm run serve", "not found").into();
        assert_eq!(spawn.exit_code(), 71);
        assert_eq!(CliError::from(DevServerError::ZeroTimeout).exit_code(), 2);
    }

    #[test]
    fn test_dev_server_message_is_transparent() {
        let err: CliError = DevServerError::ExitedPrematurely {
            script: "serve".into(),
            stderr: "Error: port in use\n".into(),
        }
        .into();
        assert!(err.to_string().starts_with("The npm script 'serve'"));
    }
}
