//! Command dispatch: bridges CLI args -> core workflow -> output formatting.

pub mod config_cmd;
pub mod plan;
pub mod provision;
pub mod util;
pub mod verify;
pub mod zones;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a manifest- or controller-bound command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Plan(args) => plan::handle(&args, global),
        Command::Zones(args) => zones::handle(&args, global),
        Command::Verify => verify::handle(global).await,
        Command::Provision(args) => provision::handle(args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal {
            message: "command dispatched twice".into(),
        }),
    }
}
