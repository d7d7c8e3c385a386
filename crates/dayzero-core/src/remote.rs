// ── Remote collaborators ──
//
// The three narrow interfaces the workflow calls across the network.
// Implementations own transport, retry and timeout policy; every outcome
// they report is final for the stage that issued the call.

use std::future::Future;

use secrecy::SecretString;
use uuid::Uuid;

use crate::allocator::SitePlan;
use crate::config::SiteDetails;
use crate::error::RemoteFailure;
use crate::model::{DeviceIdentity, MacAddress, SessionIdentity};

// ── Reachability ─────────────────────────────────────────────────────

/// An organization-scoped grant reported by the probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgGrant {
    pub org_id: Uuid,
    pub name: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResponse {
    /// `false` when the controller rejected the credential outright.
    pub authenticated: bool,
    pub email: Option<String>,
    pub grants: Vec<OrgGrant>,
}

impl ProbeResponse {
    pub fn rejected() -> Self {
        Self::default()
    }
}

pub trait ReachabilityClient: Send + Sync {
    fn probe(
        &self,
        credential: &SecretString,
    ) -> impl Future<Output = Result<ProbeResponse, RemoteFailure>> + Send;
}

// ── Site creation ────────────────────────────────────────────────────

/// Everything the controller needs to materialize one site.
#[derive(Debug, Clone, Copy)]
pub struct SiteCreation<'a> {
    pub name: &'a str,
    pub zone: u32,
    pub plan: &'a SitePlan,
    pub details: &'a SiteDetails,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteCreated {
    pub site_id: Uuid,
}

pub trait SiteCreationClient: Send + Sync {
    fn create_site(
        &self,
        session: &SessionIdentity,
        site: SiteCreation<'_>,
    ) -> impl Future<Output = Result<SiteCreated, RemoteFailure>> + Send;
}

// ── Device claim ─────────────────────────────────────────────────────

/// Result of one claim call. `claimed == false` means the controller
/// refused because the device already belongs elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub claimed: bool,
    pub mac: Option<MacAddress>,
    pub serial: Option<String>,
    pub model: Option<String>,
}

pub trait DeviceClaimClient: Send + Sync {
    fn claim(
        &self,
        session: &SessionIdentity,
        device: &DeviceIdentity,
        site_id: Uuid,
    ) -> impl Future<Output = Result<ClaimReceipt, RemoteFailure>> + Send;
}

// ── Borrowed collaborators ───────────────────────────────────────────

impl<T: ReachabilityClient> ReachabilityClient for &T {
    fn probe(
        &self,
        credential: &SecretString,
    ) -> impl Future<Output = Result<ProbeResponse, RemoteFailure>> + Send {
        (**self).probe(credential)
    }
}

impl<T: SiteCreationClient> SiteCreationClient for &T {
    fn create_site(
        &self,
        session: &SessionIdentity,
        site: SiteCreation<'_>,
    ) -> impl Future<Output = Result<SiteCreated, RemoteFailure>> + Send {
        (**self).create_site(session, site)
    }
}

impl<T: DeviceClaimClient> DeviceClaimClient for &T {
    fn claim(
        &self,
        session: &SessionIdentity,
        device: &DeviceIdentity,
        site_id: Uuid,
    ) -> impl Future<Output = Result<ClaimReceipt, RemoteFailure>> + Send {
        (**self).claim(session, device, site_id)
    }
}
