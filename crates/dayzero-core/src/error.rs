// ── Core error types ──
//
// The taxonomy the provisioning workflow reasons about. Identity errors
// abort a run; allocation, remote and claim errors are recorded against
// the one site or device they concern. The `From<dayzero_api::Error>`
// impl sorts transport-layer errors into rejections and transport failures.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::address::AddressBlock;
use crate::model::{Capability, SiteStage};

// ── Address parsing ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("invalid CIDR block '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("prefix length /{prefix} is out of range for IPv4")]
    PrefixOutOfRange { prefix: u8 },

    #[error("{input} has host bits set (did you mean {aligned}?)")]
    Misaligned { input: String, aligned: String },
}

// ── Allocation ───────────────────────────────────────────────────────

/// Which level of the allocation tree could not be satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum AllocationLevel {
    Zone,
    Site,
    FunctionalSubnet { name: String },
}

impl fmt::Display for AllocationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zone => f.write_str("zone"),
            Self::Site => f.write_str("site"),
            Self::FunctionalSubnet { name } => write!(f, "functional subnet '{name}'"),
        }
    }
}

/// Why a level overflowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverflowKind {
    /// More children (or a higher index) requested than the parent holds.
    Exhausted { requested: u64, available: u64 },
    /// The child prefix is too shallow: sites must sit strictly deeper than
    /// their zone, zones no shallower than the supernet.
    PrefixNotDeeper { child_prefix: u8 },
    /// No aligned free range is left for a subnet of this size.
    NoRoom {
        hosts: u32,
        block_size: u64,
        free: u64,
    },
}

impl fmt::Display for OverflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted {
                requested,
                available,
            } => write!(f, "requested {requested}, only {available} available"),
            Self::PrefixNotDeeper { child_prefix } => {
                write!(f, "prefix /{child_prefix} is not deeper than the parent")
            }
            Self::NoRoom {
                hosts,
                block_size,
                free,
            } => write!(
                f,
                "{hosts} hosts need a {block_size}-address block, {free} addresses left unplaced"
            ),
        }
    }
}

/// The `AllocationOverflow` failure: a topology request does not fit its parent.
///
/// Never accompanied by a partial result.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("allocation overflow at {level} level in {parent}: {kind}")]
pub struct AllocationOverflow {
    #[serde(flatten)]
    pub level: AllocationLevel,
    pub parent: AddressBlock,
    #[serde(flatten)]
    pub kind: OverflowKind,
}

// ── Remote collaborators ─────────────────────────────────────────────

/// Outcome of a failed remote call, as seen by the workflow.
///
/// Transport-level retry has already happened (or not) below this layer;
/// the workflow treats either variant as terminal for the current stage.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "failure", rename_all = "snake_case")]
pub enum RemoteFailure {
    /// The controller answered and refused the request.
    #[error("rejected by controller{}: {reason}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Rejection { status: Option<u16>, reason: String },

    /// The request did not complete; its remote effect is unknown.
    #[error("transport failure: {reason}")]
    Transport { reason: String },
}

impl RemoteFailure {
    pub fn rejection(reason: impl Into<String>) -> Self {
        Self::Rejection {
            status: None,
            reason: reason.into(),
        }
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }
}

impl From<dayzero_api::Error> for RemoteFailure {
    fn from(err: dayzero_api::Error) -> Self {
        use dayzero_api::Error as ApiError;

        // A definite 4xx answer is a refusal; everything else leaves the
        // remote effect unknown.
        match err.status() {
            Some(status) if status < 500 && !err.is_transient() => Self::Rejection {
                status: Some(status),
                reason: match err {
                    ApiError::Authentication { message }
                    | ApiError::Forbidden { message }
                    | ApiError::Api { message, .. } => message,
                    other => other.to_string(),
                },
            },
            _ => Self::transport(err.to_string()),
        }
    }
}

// ── Identity ─────────────────────────────────────────────────────────

/// Identity-stage failures. Any of these aborts the whole run before a
/// single remote mutation is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("credential rejected by the controller")]
    Unauthenticated,

    #[error("organization could not be resolved: {reason}")]
    UnknownOrganization { reason: String },

    #[error("role '{role}' lacks required capabilities: {}", join(missing))]
    InsufficientPermissions {
        role: String,
        missing: Vec<Capability>,
    },

    #[error("reachability probe failed: {0}")]
    Unreachable(#[from] RemoteFailure),
}

fn join(caps: &[Capability]) -> String {
    caps.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Inventory ────────────────────────────────────────────────────────

/// Per-device binding failures. None of them revert the site's
/// `Provisioned` state on the controller.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClaimError {
    /// The controller reports the device as claimed or assigned elsewhere.
    /// Surfaced as a decision for the operator; never retried.
    #[error("device {device} is already claimed or bound to another site")]
    AlreadyClaimed { device: String },

    #[error("site '{site}' is not ready for binding (state: {stage})")]
    SiteNotReady { site: String, stage: SiteStage },

    #[error("invalid device identity '{code}': {reason}")]
    InvalidClaimCode { code: String, reason: String },

    #[error("claim failed: {0}")]
    Remote(#[from] RemoteFailure),
}

// ── Top-level ────────────────────────────────────────────────────────

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Allocation(#[from] AllocationOverflow),

    #[error(transparent)]
    Claim(#[from] ClaimError),

    #[error(transparent)]
    Remote(#[from] RemoteFailure),

    #[error("site '{site}' cannot move from {from} to {to}")]
    InvalidTransition {
        site: String,
        from: String,
        to: String,
    },

    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("run cancelled before identity verification completed")]
    Cancelled,
}

impl From<dayzero_api::Error> for CoreError {
    fn from(err: dayzero_api::Error) -> Self {
        match err {
            dayzero_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            dayzero_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS setup failed: {msg}"),
            },
            other => CoreError::Remote(other.into()),
        }
    }
}
