//! `verify`: one reachability handshake with the configured credential.

use std::fmt::Write as _;

use dayzero_core::{Capability, IdentityVerifier, PROVISIONING_CAPABILITIES, SessionIdentity};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

fn detail(session: &SessionIdentity) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Organization: {} ({})",
        session.organization_name.as_deref().unwrap_or("-"),
        session.organization_id
    );
    let _ = writeln!(out, "User:         {}", session.email.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "Role:         {}", session.role);
    let caps: Vec<_> = session.capabilities.iter().map(ToString::to_string).collect();
    let _ = write!(out, "Capabilities: {}", caps.join(", "));
    out
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let (profile_name, controller) = config::controller_config(global)?;
    let client = dayzero_core::connect(&controller)?;

    let verifier = IdentityVerifier::new(&client)
        .with_organization(controller.org_id)
        .requiring([Capability::Read]);
    let session = verifier
        .verify(&controller.api_key)
        .await
        .map_err(|e| CliError::from(e).for_profile(&profile_name))?;

    let out = output::render_single(&global.output, session, detail, |s| {
        s.organization_id.to_string()
    })?;
    output::print_output(&out, global.quiet);

    let missing = session.missing(&PROVISIONING_CAPABILITIES);
    if !missing.is_empty() && !global.quiet {
        let missing: Vec<_> = missing.iter().map(ToString::to_string).collect();
        eprintln!(
            "Note: role '{}' cannot provision (missing {})",
            session.role,
            missing.join(", ")
        );
    }
    Ok(())
}
