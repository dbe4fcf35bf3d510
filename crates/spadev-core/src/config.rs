//! Launch configuration for a front-end dev server.
//!
//! These are pure domain types with no process or filesystem dependencies.
//! `DevServerOptions` says *what* to launch; `ScriptLauncher` says *how* a
//! script name turns into a command line.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{DevServerError, DevServerResult};

/// Default time allowed for the dev server to print its readiness line.
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 120;

/// Host name passed to the dev server and used in the target address.
pub const LAUNCH_HOST: &str = "localhost";

/// Arguments appended after the script name: `--port <port> --host localhost`.
pub fn script_arguments(port: u16) -> Vec<String> {
    vec![
        "--port".to_string(),
        port.to_string(),
        "--host".to_string(),
        LAUNCH_HOST.to_string(),
    ]
}

/// How a script name is turned into a process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptLauncher {
    /// `npm run <script> -- --port <port> --host localhost`
    #[default]
    Npm,
    /// The script name is itself the executable.
    Direct,
    /// `<program> <args...> <script> --port <port> --host localhost`
    ///
    /// Covers `yarn`, `pnpm run`, `sh serve.sh` and similar.
    Program {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl ScriptLauncher {
    /// Build the command line for `script` listening on `port`.
    pub fn command_for(&self, script: &str, port: u16) -> LaunchCommand {
        let script_args = script_arguments(port);
        match self {
            Self::Npm => {
                let mut args = vec!["run".to_string(), script.to_string(), "--".to_string()];
                args.extend(script_args);
                // npm is a .cmd shim on Windows and cannot be spawned directly
                if cfg!(windows) {
                    let mut wrapped = vec!["/c".to_string(), "npm".to_string()];
                    wrapped.extend(args);
                    LaunchCommand::new("cmd", wrapped)
                } else {
                    LaunchCommand::new("npm", args)
                }
            }
            Self::Direct => LaunchCommand::new(script, script_args),
            Self::Program { program, args } => {
                let mut full = args.clone();
                full.push(script.to_string());
                full.extend(script_args);
                LaunchCommand::new(program.clone(), full)
            }
        }
    }
}

/// A fully resolved program + argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchCommand {
    /// Create a new launch command.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Options for attaching to a dev server.
///
/// Missing fields fall back to [`DevServerOptions::default`] when
/// deserialized, so a config file only needs `source_path` and `script_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevServerOptions {
    /// Directory of the front-end project; the script runs inside it.
    pub source_path: PathBuf,

    /// Name of the script to run (e.g. `serve`).
    pub script_name: String,

    /// Overall time allowed for the server to become ready.
    #[serde(rename = "startup_timeout_secs", with = "duration_secs")]
    pub startup_timeout: Duration,

    /// How the script is invoked.
    pub launcher: ScriptLauncher,

    /// Extra environment variables for the child process.
    pub env: BTreeMap<String, String>,

    /// Forward the child's stdout/stderr lines into the log.
    pub forward_output: bool,
}

impl Default for DevServerOptions {
    fn default() -> Self {
        Self {
            source_path: PathBuf::new(),
            script_name: String::new(),
            startup_timeout: Duration::from_secs(DEFAULT_STARTUP_TIMEOUT_SECS),
            launcher: ScriptLauncher::default(),
            env: BTreeMap::new(),
            forward_output: true,
        }
    }
}

impl DevServerOptions {
    /// Create options with the required fields and defaults for the rest.
    pub fn new(source_path: impl Into<PathBuf>, script_name: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            script_name: script_name.into(),
            ..Self::default()
        }
    }

    /// Set the overall startup timeout.
    #[must_use]
    pub const fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Set the launcher.
    #[must_use]
    pub fn with_launcher(mut self, launcher: ScriptLauncher) -> Self {
        self.launcher = launcher;
        self
    }

    /// Add an environment variable for the child process.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Enable or disable forwarding of child output into the log.
    #[must_use]
    pub const fn with_forward_output(mut self, forward: bool) -> Self {
        self.forward_output = forward;
        self
    }

    /// Check the required fields and that the startup timeout is non-zero.
    ///
    /// Runs before any port is allocated or process spawned.
    pub fn validate(&self) -> DevServerResult<()> {
        if self.source_path.as_os_str().is_empty() {
            return Err(DevServerError::InvalidArgument {
                name: "source_path",
            });
        }
        if self.script_name.is_empty() {
            return Err(DevServerError::InvalidArgument {
                name: "script_name",
            });
        }
        if self.startup_timeout.is_zero() {
            return Err(DevServerError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Timeout as seconds: whole numbers for whole seconds, fractions otherwise.
mod duration_secs {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        if value.subsec_nanos() == 0 {
            serializer.serialize_u64(value.as_secs())
        } else {
            serializer.serialize_f64(value.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_arguments_are_deterministic() {
        assert_eq!(
            script_arguments(5173),
            vec!["--port", "5173", "--host", "localhost"]
        );
    }

    #[test]
    #[cfg(not(windows))]
    fn test_npm_launcher_separates_script_arguments() {
        let cmd = ScriptLauncher::Npm.command_for("serve", 8080);
        assert_eq!(cmd.program, "npm");
        assert_eq!(
            cmd.to_string(),
            "npm run serve -- --port 8080 --host localhost"
        );
    }

    #[test]
    #[cfg(windows)]
    fn test_npm_launcher_wraps_in_cmd_on_windows() {
        let cmd = ScriptLauncher::Npm.command_for("serve", 8080);
        assert_eq!(cmd.program, "cmd");
        assert_eq!(&cmd.args[..3], ["/c", "npm", "run"]);
    }

    #[test]
    fn test_direct_launcher_runs_script_as_program() {
        let cmd = ScriptLauncher::Direct.command_for("serve", 3000);
        assert_eq!(cmd.to_string(), "serve --port 3000 --host localhost");
    }

    #[test]
    fn test_program_launcher_prefixes_args() {
        let launcher = ScriptLauncher::Program {
            program: "pnpm".to_string(),
            args: vec!["run".to_string()],
        };
        let cmd = launcher.command_for("dev", 4000);
        assert_eq!(cmd.to_string(), "pnpm run dev --port 4000 --host localhost");
    }

    #[test]
    fn test_validate_rejects_empty_source_path() {
        let opts = DevServerOptions::new("", "serve");
        assert_eq!(
            opts.validate(),
            Err(DevServerError::InvalidArgument {
                name: "source_path"
            })
        );
    }

    #[test]
    fn test_validate_rejects_empty_script_name() {
        let opts = DevServerOptions::new("/project", "");
        assert_eq!(
            opts.validate(),
            Err(DevServerError::InvalidArgument {
                name: "script_name"
            })
        );
    }

    #[test]
    fn test_defaults() {
        let opts = DevServerOptions::new("/project", "serve");
        assert!(opts.validate().is_ok());
        assert_eq!(opts.startup_timeout, Duration::from_secs(120));
        assert_eq!(opts.launcher, ScriptLauncher::Npm);
        assert!(opts.forward_output);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let json = r#"{
            "source_path": "ClientApp",
            "script_name": "serve",
            "startup_timeout_secs": 30,
            "launcher": { "kind": "program", "program": "yarn" },
            "env": { "BROWSER": "none" }
        }"#;
        let opts: DevServerOptions = serde_json::from_str(json).unwrap();
        assert_eq!(opts.source_path, PathBuf::from("ClientApp"));
        assert_eq!(opts.startup_timeout, Duration::from_secs(30));
        assert_eq!(
            opts.launcher,
            ScriptLauncher::Program {
                program: "yarn".to_string(),
                args: vec![],
            }
        );
        assert_eq!(opts.env.get("BROWSER").map(String::as_str), Some("none"));
        assert!(opts.forward_output);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let opts = DevServerOptions::new("/project", "serve").with_startup_timeout(Duration::ZERO);
        assert_eq!(opts.validate(), Err(DevServerError::ZeroTimeout));
    }

    #[test]
    fn test_sub_second_timeout_survives_serialization() {
        let opts = DevServerOptions::new("/project", "serve")
            .with_startup_timeout(Duration::from_millis(500));
        let json = serde_json::to_value(&opts).unwrap();
        assert_eq!(json["startup_timeout_secs"], serde_json::json!(0.5));

        let back: DevServerOptions = serde_json::from_value(json).unwrap();
        assert_eq!(back.startup_timeout, Duration::from_millis(500));
        assert!(back.validate().is_ok());
    }

    #[test]
    fn test_whole_second_timeout_serializes_as_integer() {
        let opts = DevServerOptions::new("/project", "serve");
        let json = serde_json::to_value(&opts).unwrap();
        assert_eq!(json["startup_timeout_secs"], serde_json::json!(120));
    }

    #[test]
    fn test_negative_timeout_is_rejected_on_deserialize() {
        let json = r#"{ "source_path": "web", "script_name": "dev", "startup_timeout_secs": -1 }"#;
        assert!(serde_json::from_str::<DevServerOptions>(json).is_err());
    }
}
