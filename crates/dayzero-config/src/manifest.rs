// ── Deployment manifests ──
//
// A manifest is the on-disk form of a `DeploymentPlan`: topology layout,
// functional subnets, per-site defaults and the site list. TOML or YAML,
// chosen by file extension. Unknown keys are rejected so a typo cannot
// silently drop a setting.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Format, Toml, Yaml},
};
use serde::Deserialize;
use uuid::Uuid;

use dayzero_core::{
    AddressBlock, ConfigurationSource, DeploymentPlan, SiteDetails, SiteRequest, SiteTemplates,
    SubnetSpec, TopologyLayout,
};

use crate::ConfigError;

const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";
const DEFAULT_COUNTRY: &str = "US";

// ── Raw manifest structs ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    topology: Topology,
    #[serde(default)]
    subnets: Vec<SubnetEntry>,
    #[serde(default)]
    site_defaults: SiteDefaults,
    #[serde(default)]
    sites: Vec<SiteEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Topology {
    supernet: AddressBlock,
    zones: u32,
    zone_prefix: u8,
    sites_per_zone: u32,
    site_prefix: u8,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SubnetEntry {
    name: String,
    hosts: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SiteDefaults {
    #[serde(default = "default_timezone")]
    timezone: String,
    #[serde(default = "default_country")]
    country_code: String,
    #[serde(default)]
    templates: TemplateEntry,
}

impl Default for SiteDefaults {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            country_code: default_country(),
            templates: TemplateEntry::default(),
        }
    }
}

/// Template IDs to bind at creation, by controller template kind.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateEntry {
    gateway: Option<Uuid>,
    network: Option<Uuid>,
    rf: Option<Uuid>,
    security_policy: Option<Uuid>,
    alarm: Option<Uuid>,
}

impl From<TemplateEntry> for SiteTemplates {
    fn from(t: TemplateEntry) -> Self {
        Self {
            gateway_template: t.gateway,
            network_template: t.network,
            rf_template: t.rf,
            security_policy: t.security_policy,
            alarm_template: t.alarm,
        }
    }
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.into()
}
fn default_country() -> String {
    DEFAULT_COUNTRY.into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SiteEntry {
    name: String,
    zone: u32,
    site: u32,
    address: Option<String>,
    timezone: Option<String>,
    country_code: Option<String>,
    notes: Option<String>,
    #[serde(default)]
    templates: TemplateEntry,
    #[serde(default)]
    devices: Vec<String>,
}

impl Manifest {
    fn into_plan(self) -> Result<DeploymentPlan, ConfigError> {
        let layout = TopologyLayout {
            supernet: self.topology.supernet,
            zone_count: self.topology.zones,
            zone_prefix: self.topology.zone_prefix,
            sites_per_zone: self.topology.sites_per_zone,
            site_prefix: self.topology.site_prefix,
            subnets: self
                .subnets
                .into_iter()
                .map(|s| SubnetSpec::new(s.name, s.hosts))
                .collect(),
        };

        let defaults = self.site_defaults;
        let default_templates = SiteTemplates::from(defaults.templates);
        let sites = self
            .sites
            .into_iter()
            .map(|entry| {
                let details = SiteDetails {
                    address: entry.address,
                    timezone: Some(entry.timezone.unwrap_or_else(|| defaults.timezone.clone())),
                    country_code: Some(
                        entry
                            .country_code
                            .unwrap_or_else(|| defaults.country_code.clone()),
                    ),
                    notes: entry.notes,
                    templates: SiteTemplates::from(entry.templates).or(default_templates),
                };
                SiteRequest::new(entry.name, entry.zone, entry.site)
                    .with_details(details)
                    .with_devices(entry.devices)
            })
            .collect();

        Ok(DeploymentPlan::new(layout, sites)?)
    }
}

// ── Loading ─────────────────────────────────────────────────────────

/// Parse manifest text in the format implied by `path`'s extension.
fn parse(path: &Path, text: &str) -> Result<Manifest, ConfigError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let figment = match ext.as_deref() {
        Some("toml") => Figment::from(Toml::string(text)),
        Some("yaml" | "yml") => Figment::from(Yaml::string(text)),
        _ => {
            return Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }
    };
    Ok(figment.extract()?)
}

/// Read, parse and validate a manifest file.
pub fn load_manifest(path: &Path) -> Result<DeploymentPlan, ConfigError> {
    tracing::debug!(path = %path.display(), "loading manifest");
    let text = std::fs::read_to_string(path)?;
    parse(path, &text)?.into_plan()
}

/// A manifest file as a [`ConfigurationSource`].
#[derive(Debug, Clone)]
pub struct ManifestFile {
    path: PathBuf,
}

impl ManifestFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigurationSource for ManifestFile {
    type Error = ConfigError;

    fn load(&self) -> Result<DeploymentPlan, Self::Error> {
        load_manifest(&self.path)
    }
}
