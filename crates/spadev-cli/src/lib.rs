//! spadev CLI library: argument parsing, error mapping and the run loop.
//!
//! The binary in `main.rs` is the composition root; everything it wires
//! together lives here so it can be tested.

pub mod error;
pub mod parser;
pub mod registrar;
pub mod run;

pub use error::CliError;
pub use parser::{Cli, LauncherKind};
pub use registrar::TargetSlot;
pub use run::execute;
