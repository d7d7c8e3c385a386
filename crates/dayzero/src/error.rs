//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use dayzero_config::ConfigError;
use dayzero_core::{CoreError, IdentityError, RemoteFailure};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const PARTIAL: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the controller: {reason}")]
    #[diagnostic(
        code(dayzero::connection_failed),
        help(
            "Check the profile's host or region and your network.\n\
             Try: dayzero verify -vv"
        )
    )]
    ConnectionFailed { reason: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed for profile '{profile}'")]
    #[diagnostic(
        code(dayzero::auth_failed),
        help(
            "The controller rejected the API token.\n\
             Store a new one with: dayzero config set-key --profile {profile}"
        )
    )]
    AuthFailed { profile: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(dayzero::no_credentials),
        help(
            "Configure credentials with: dayzero config init\n\
             Or set the DAYZERO_API_KEY environment variable."
        )
    )]
    NoCredentials { profile: String },

    #[error("Organization could not be resolved: {reason}")]
    #[diagnostic(
        code(dayzero::unknown_organization),
        help("Pin the organization with --org or `org_id` in your profile.")
    )]
    UnknownOrganization { reason: String },

    #[error("Role '{role}' is missing: {missing}")]
    #[diagnostic(
        code(dayzero::permission_denied),
        help("Provisioning needs a token with write (or admin) access to the organization.")
    )]
    PermissionDenied { role: String, missing: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("API error ({code}): {message}")]
    #[diagnostic(code(dayzero::api_error))]
    ApiError { code: String, message: String },

    // ── Runs ─────────────────────────────────────────────────────────

    #[error("{incomplete} of {total} sites did not reach active")]
    #[diagnostic(
        code(dayzero::incomplete_run),
        help(
            "See the report above for each site's state and cause.\n\
             Sites already provisioned remain on the controller."
        )
    )]
    Incomplete { incomplete: usize, total: usize },

    #[error("{count} site(s) cannot be allocated in this topology")]
    #[diagnostic(
        code(dayzero::allocation_overflow),
        help("Widen the supernet or zone/site prefixes, or shrink the functional subnets.")
    )]
    Unplannable { count: usize },

    #[error("Interrupted before any site was touched")]
    #[diagnostic(code(dayzero::interrupted))]
    Interrupted,

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(dayzero::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(dayzero::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: dayzero config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(dayzero::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(dayzero::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Internal ─────────────────────────────────────────────────────

    #[error("Internal error: {message}")]
    #[diagnostic(code(dayzero::internal))]
    Internal { message: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON rendering failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::UnknownOrganization { .. } | Self::ProfileNotFound { .. } => {
                exit_code::NOT_FOUND
            }
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::Incomplete { .. } => exit_code::PARTIAL,
            Self::Interrupted => exit_code::INTERRUPTED,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the active profile name to authentication failures.
    pub fn for_profile(self, profile: &str) -> Self {
        match self {
            Self::AuthFailed { .. } => Self::AuthFailed {
                profile: profile.into(),
            },
            other => other,
        }
    }
}

// ── Core / config → CliError mapping ─────────────────────────────────

impl From<RemoteFailure> for CliError {
    fn from(err: RemoteFailure) -> Self {
        match err {
            RemoteFailure::Transport { reason } => Self::ConnectionFailed { reason },
            RemoteFailure::Rejection { status, reason } => Self::ApiError {
                code: status.map_or_else(|| "rejected".into(), |s| s.to_string()),
                message: reason,
            },
        }
    }
}

impl From<IdentityError> for CliError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Unauthenticated => Self::AuthFailed {
                profile: "current".into(),
            },
            IdentityError::UnknownOrganization { reason } => Self::UnknownOrganization { reason },
            IdentityError::InsufficientPermissions { role, missing } => Self::PermissionDenied {
                role,
                missing: missing
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            },
            IdentityError::Unreachable(failure) => failure.into(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Identity(e) => e.into(),
            CoreError::Remote(e) => e.into(),

            CoreError::Address(e) => Self::Validation {
                field: "address".into(),
                reason: e.to_string(),
            },

            CoreError::Allocation(e) => Self::Validation {
                field: "topology".into(),
                reason: e.to_string(),
            },

            CoreError::Claim(e) => Self::ApiError {
                code: "claim".into(),
                message: e.to_string(),
            },

            CoreError::Validation { field, reason } => Self::Validation { field, reason },

            CoreError::Config { message } => Self::Validation {
                field: "profile".into(),
                reason: message,
            },

            CoreError::Cancelled => Self::Interrupted,

            err @ CoreError::InvalidTransition { .. } => Self::Internal {
                message: err.to_string(),
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Plan(core) => core.into(),
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config(Box::new(other)),
        }
    }
}
