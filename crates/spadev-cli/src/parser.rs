//! Main CLI parser.
//!
//! Flags map one-to-one onto `DevServerOptions`; the most common ones also
//! read from `SPADEV_*` environment variables (a `.env` file works too).

use clap::{Parser, ValueEnum};
use spadev_core::{DEFAULT_STARTUP_TIMEOUT_SECS, DevServerOptions, ScriptLauncher};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CliError;

/// Launch a front-end dev server and print the address to forward requests to.
#[derive(Debug, Parser)]
#[command(name = "spadev")]
#[command(about = "Launch a front-end dev server and wait until it is listening")]
#[command(version)]
pub struct Cli {
    /// Front-end project directory the script runs in
    #[arg(long, env = "SPADEV_SOURCE")]
    pub source: PathBuf,

    /// Script to run (e.g. serve, dev)
    #[arg(long, env = "SPADEV_SCRIPT", default_value = "serve")]
    pub script: String,

    /// Seconds to wait for the dev server to report that it is listening
    #[arg(long = "timeout", env = "SPADEV_TIMEOUT", default_value_t = DEFAULT_STARTUP_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// How the script is launched
    #[arg(long, value_enum, default_value_t = LauncherKind::Npm)]
    pub launcher: LauncherKind,

    /// Program used with `--launcher program` (e.g. yarn, pnpm, sh)
    #[arg(long, required_if_eq("launcher", "program"))]
    pub program: Option<String>,

    /// Argument placed before the script name with `--launcher program`
    #[arg(long = "program-arg", allow_hyphen_values = true)]
    pub program_args: Vec<String>,

    /// Extra environment variable for the dev server, as KEY=VALUE
    #[arg(long = "env", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Do not forward dev server output to the log
    #[arg(long)]
    pub quiet_output: bool,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Launcher selection on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LauncherKind {
    /// npm run <script> -- <args>
    Npm,
    /// <script> <args>
    Direct,
    /// <program> [program-arg...] <script> <args>
    Program,
}

impl Cli {
    /// Build launch options from the parsed flags.
    pub fn to_options(&self) -> Result<DevServerOptions, CliError> {
        let launcher = match self.launcher {
            LauncherKind::Npm => ScriptLauncher::Npm,
            LauncherKind::Direct => ScriptLauncher::Direct,
            LauncherKind::Program => ScriptLauncher::Program {
                program: self.program.clone().ok_or_else(|| {
                    CliError::Arguments("--program is required with --launcher program".into())
                })?,
                args: self.program_args.clone(),
            },
        };

        let mut options = DevServerOptions::new(&self.source, &self.script)
            .with_startup_timeout(Duration::from_secs(self.timeout_secs))
            .with_launcher(launcher)
            .with_forward_output(!self.quiet_output);
        options.env.extend(self.env.iter().cloned());
        Ok(options)
    }
}

fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty variable name in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
