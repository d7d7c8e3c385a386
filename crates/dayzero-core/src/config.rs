// ── Run configuration ──
//
// `ControllerConfig` describes how to reach the controller and
// `DeploymentPlan` describes what to build. Both are constructed outside
// the core and handed in; the core never reads files.

use std::collections::HashSet;
use std::convert::Infallible;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use crate::allocator::TopologyLayout;
use crate::error::CoreError;
use crate::model::DeviceIdentity;

// ── Controller connection ────────────────────────────────────────────

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// Additional CA certificate (PEM) for TLS-intercepting proxies.
    CustomCa(PathBuf),
}

/// Connection settings for one controller.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// API root, e.g. `https://api.mist.com`.
    pub url: Url,
    pub api_key: SecretString,
    /// Pins the organization; otherwise the credential must grant exactly one.
    pub org_id: Option<Uuid>,
    pub tls: TlsVerification,
    pub timeout: Duration,
}

// ── Deployment ───────────────────────────────────────────────────────

/// Controller templates bound to a site when it is created. Unset
/// entries leave the controller's org-level default in effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SiteTemplates {
    pub gateway_template: Option<Uuid>,
    pub network_template: Option<Uuid>,
    pub rf_template: Option<Uuid>,
    pub security_policy: Option<Uuid>,
    pub alarm_template: Option<Uuid>,
}

impl SiteTemplates {
    /// Entries set here win; the rest come from `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            gateway_template: self.gateway_template.or(fallback.gateway_template),
            network_template: self.network_template.or(fallback.network_template),
            rf_template: self.rf_template.or(fallback.rf_template),
            security_policy: self.security_policy.or(fallback.security_policy),
            alarm_template: self.alarm_template.or(fallback.alarm_template),
        }
    }
}

/// Optional site attributes passed through to the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SiteDetails {
    pub address: Option<String>,
    pub timezone: Option<String>,
    pub country_code: Option<String>,
    pub notes: Option<String>,
    pub templates: SiteTemplates,
}

/// One site to bring up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteRequest {
    pub name: String,
    pub zone: u32,
    /// Slot within the zone.
    pub site: u32,
    pub details: SiteDetails,
    /// Raw device identities (claim codes or MACs), parsed at bind time.
    pub devices: Vec<String>,
}

impl SiteRequest {
    pub fn new(name: impl Into<String>, zone: u32, site: u32) -> Self {
        Self {
            name: name.into(),
            zone,
            site,
            details: SiteDetails::default(),
            devices: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_devices<I, S>(mut self, devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.devices = devices.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: SiteDetails) -> Self {
        self.details = details;
        self
    }
}

/// A validated layout plus site list, ready for a run.
///
/// Structural mistakes (duplicates, zero counts, empty names) are rejected
/// here. Whether the layout fits the address space is the allocator's call
/// and is reported per site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentPlan {
    layout: TopologyLayout,
    sites: Vec<SiteRequest>,
}

impl DeploymentPlan {
    pub fn new(layout: TopologyLayout, sites: Vec<SiteRequest>) -> Result<Self, CoreError> {
        validate_layout(&layout)?;
        validate_sites(&sites)?;
        Ok(Self { layout, sites })
    }

    pub fn layout(&self) -> &TopologyLayout {
        &self.layout
    }

    pub fn sites(&self) -> &[SiteRequest] {
        &self.sites
    }

    pub fn into_parts(self) -> (TopologyLayout, Vec<SiteRequest>) {
        (self.layout, self.sites)
    }
}

/// Supplies the deployment plan, once, at the start of a run.
pub trait ConfigurationSource {
    type Error;

    fn load(&self) -> Result<DeploymentPlan, Self::Error>;
}

impl ConfigurationSource for DeploymentPlan {
    type Error = Infallible;

    fn load(&self) -> Result<DeploymentPlan, Self::Error> {
        Ok(self.clone())
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> CoreError {
    CoreError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

fn validate_layout(layout: &TopologyLayout) -> Result<(), CoreError> {
    if layout.zone_count == 0 {
        return Err(invalid("zone_count", "must be at least 1"));
    }
    if layout.sites_per_zone == 0 {
        return Err(invalid("sites_per_zone", "must be at least 1"));
    }

    let mut names = HashSet::new();
    for spec in &layout.subnets {
        let field = format!("subnets.{}", spec.name);
        if spec.name.trim().is_empty() {
            return Err(invalid("subnets", "subnet name must not be empty"));
        }
        if spec.hosts == 0 {
            return Err(invalid(field, "host capacity must be at least 1"));
        }
        if !names.insert(spec.name.as_str()) {
            return Err(invalid(field, "duplicate subnet name"));
        }
    }
    Ok(())
}

fn validate_sites(sites: &[SiteRequest]) -> Result<(), CoreError> {
    let mut names = HashSet::new();
    let mut slots = HashSet::new();
    let mut devices = HashSet::new();

    for request in sites {
        if request.name.trim().is_empty() {
            return Err(invalid("sites", "site name must not be empty"));
        }
        let field = format!("sites.{}", request.name);
        if !names.insert(request.name.as_str()) {
            return Err(invalid(field, "duplicate site name"));
        }
        if !slots.insert((request.zone, request.site)) {
            return Err(invalid(
                field,
                format!(
                    "zone {} slot {} is already used by another site",
                    request.zone, request.site
                ),
            ));
        }
        for raw in &request.devices {
            // Malformed identities are reported per device at bind time;
            // compare them verbatim here.
            let key = DeviceIdentity::parse(raw)
                .map(|id| id.to_string())
                .unwrap_or_else(|_| raw.trim().to_owned());
            if !devices.insert(key) {
                return Err(invalid(
                    format!("{field}.devices"),
                    format!("device '{raw}' is listed more than once"),
                ));
            }
        }
    }
    Ok(())
}
