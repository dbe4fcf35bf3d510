//! The `spadev` run loop.
//!
//! Attach, wait for the dev server, print its address, then keep it alive
//! until Ctrl-C.

use spadev_core::{DevServerError, ProxyTargetProvider};
use spadev_runtime::attach;
use tracing::info;

use crate::error::CliError;
use crate::parser::Cli;
use crate::registrar::TargetSlot;

/// Execute the CLI.
pub async fn execute(cli: &Cli) -> Result<(), CliError> {
    let options = cli.to_options()?;
    let slot = TargetSlot::default();
    let attachment = attach(options, &slot)?;
    let provider = slot
        .provider()
        .ok_or_else(|| DevServerError::internal("no proxy target provider was registered"))?;

    let url = tokio::select! {
        result = provider.target_uri() => result,
        signal = tokio::signal::ctrl_c() => {
            info!("Interrupted while the dev server was starting");
            attachment.shutdown().await;
            return signal.map_err(|e| CliError::Io(e.to_string()));
        }
    };

    let url = match url {
        Ok(url) => url,
        Err(e) => {
            attachment.shutdown().await;
            return Err(e.into());
        }
    };

    println!("Dev server ready at {url}");
    info!(pid = ?attachment.pid(), "Press Ctrl-C to stop the dev server");

    let signal = tokio::signal::ctrl_c().await;
    attachment.shutdown().await;
    signal.map_err(|e| CliError::Io(e.to_string()))
}
