//! CLI configuration: a thin wrapper around `dayzero_config` shared types.
//!
//! Re-exports the shared types and adds resolution that respects
//! `GlobalOpts` flag overrides (--host, --org, --api-key, --timeout).

use std::time::Duration;

use secrecy::SecretString;
use uuid::Uuid;

use dayzero_core::{ControllerConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use dayzero_config::{
    Config, Profile, config_path, load_config_or_default, save_config, store_api_key,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build the `ControllerConfig` for the active profile.
///
/// With no matching profile, flags and environment alone must supply the
/// credential; the host falls back to the default region.
pub fn controller_config(global: &GlobalOpts) -> Result<(String, ControllerConfig), CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
            names.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if names.is_empty() {
                    "(none)".into()
                } else {
                    names.join(", ")
                },
            });
        }
        None => Profile::default(),
    };

    let config = resolve_profile(&profile, &profile_name, global, cfg.defaults.timeout)?;
    Ok((profile_name, config))
}

/// Translate a `Profile` + global flags into a `ControllerConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
    default_timeout: u64,
) -> Result<ControllerConfig, CliError> {
    // 1. API root (flag > env > profile host > profile region)
    let url = match global.host {
        Some(ref host) => dayzero_config::profile_url(&Profile {
            host: Some(host.clone()),
            ..Profile::default()
        })?,
        None => dayzero_config::profile_url(profile)?,
    };

    // 2. API token
    let api_key = resolve_api_key_with_flag(profile, profile_name, global)?;

    // 3. Organization (flag > env > profile)
    let org_id = match global.org {
        Some(ref org) => Some(org.parse::<Uuid>().map_err(|_| CliError::Validation {
            field: "org".into(),
            reason: format!("not a UUID: {org}"),
        })?),
        None => profile.org_id,
    };

    // 4. TLS verification
    let tls = profile
        .ca_cert
        .clone()
        .map_or(TlsVerification::SystemDefaults, TlsVerification::CustomCa);

    // 5. Timeout
    let timeout = Duration::from_secs(
        global
            .timeout
            .or(profile.timeout)
            .unwrap_or(default_timeout),
    );

    Ok(ControllerConfig {
        url,
        api_key,
        org_id,
        tls,
        timeout,
    })
}

/// Resolve the API token with CLI flag override, then fall through to shared resolution.
fn resolve_api_key_with_flag(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<SecretString, CliError> {
    if let Some(ref key) = global.api_key {
        return Ok(SecretString::from(key.clone()));
    }
    Ok(dayzero_config::resolve_api_key(profile, profile_name)?)
}
