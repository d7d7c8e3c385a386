//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;

use dayzero_config::ManifestFile;
use dayzero_core::{ConfigurationSource, DeploymentPlan};

use crate::error::CliError;

/// Load and validate a deployment manifest.
pub fn load_plan(path: &Path) -> Result<DeploymentPlan, CliError> {
    let plan = ManifestFile::new(path).load()?;
    tracing::debug!(
        manifest = %path.display(),
        sites = plan.sites().len(),
        "manifest loaded"
    );
    Ok(plan)
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to prompt on, `--yes` is mandatory.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)?;
    Ok(confirmed)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}
