//! Clap derive structures for the `dayzero` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// dayzero -- day-zero provisioning for multi-site networks
#[derive(Debug, Parser)]
#[command(
    name = "dayzero",
    version,
    about = "Plan address space and provision sites on a cloud network controller",
    long_about = "Carves a supernet into zones, sites and functional subnets, then\n\
        creates each site on the controller and claims its devices.\n\n\
        `plan` and `zones` work offline from a deployment manifest;\n\
        `verify` and `provision` talk to the controller.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Controller profile to use
    #[arg(long, short = 'p', env = "DAYZERO_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API host or base URL (overrides profile)
    #[arg(long, env = "DAYZERO_HOST", global = true)]
    pub host: Option<String>,

    /// Organization ID (overrides profile)
    #[arg(long, env = "DAYZERO_ORG", global = true)]
    pub org: Option<String>,

    /// API token (prefer the keyring or DAYZERO_API_KEY)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DAYZERO_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "DAYZERO_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the address plan of every site in a manifest (offline)
    Plan(ManifestArgs),

    /// Show zone blocks and their site capacity (offline)
    Zones(ManifestArgs),

    /// Check that the configured credential can reach the controller
    Verify,

    /// Create every site in a manifest and claim its devices
    #[command(alias = "run")]
    Provision(ProvisionArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Manifest commands ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ManifestArgs {
    /// Deployment manifest (.toml, .yaml or .yml)
    pub manifest: PathBuf,
}

#[derive(Debug, Args)]
pub struct ProvisionArgs {
    /// Deployment manifest (.toml, .yaml or .yml)
    pub manifest: PathBuf,

    /// Sites provisioned at once (defaults to the config value)
    #[arg(long, short = 'j')]
    pub concurrency: Option<usize>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store an API token in the system keyring
    SetKey {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
