// ── Provisioning orchestrator ──
//
// Verifies identity once, then drives every requested site through its
// state machine independently and concurrently. A site's failure is
// recorded on that site only; nothing is rolled back or deleted on the
// controller. Remote calls are the only await points, and each one is
// raced against the cancellation token so an interrupted site keeps the
// last state it actually reached.

use chrono::{DateTime, Utc};
use futures_util::{StreamExt, stream};
use secrecy::SecretString;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::allocator::{SitePlan, TopologyAllocator, TopologyLayout};
use crate::config::SiteRequest;
use crate::error::{ClaimError, CoreError};
use crate::identity::IdentityVerifier;
use crate::inventory::InventoryBinder;
use crate::model::{ClaimedDevice, FailureCause, SessionIdentity, Site, SiteState};
use crate::remote::{DeviceClaimClient, ReachabilityClient, SiteCreation, SiteCreationClient};

/// Sites processed at once unless overridden.
pub const DEFAULT_CONCURRENCY: usize = 4;

// ── Outcomes ─────────────────────────────────────────────────────────

/// What happened to one device of a site.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeviceOutcome {
    Bound(ClaimedDevice),
    Rejected { device: String, error: ClaimError },
}

impl DeviceOutcome {
    pub fn is_bound(&self) -> bool {
        matches!(self, Self::Bound(_))
    }
}

/// Final record of one site.
#[derive(Debug, Clone, Serialize)]
pub struct SiteOutcome {
    pub site: Site,
    pub devices: Vec<DeviceOutcome>,
    /// Cancellation stopped the site before it reached a terminal state.
    pub interrupted: bool,
    /// Internal error that halted the site in its last recorded state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
}

impl SiteOutcome {
    /// Settle a driven site. A fault keeps the site where it stopped, next
    /// to the devices it had already bound.
    fn settle(
        site: Site,
        devices: Vec<DeviceOutcome>,
        driven: Result<bool, CoreError>,
    ) -> Self {
        let (interrupted, fault) = match driven {
            Ok(interrupted) => (interrupted, None),
            Err(err) => (false, Some(err.to_string())),
        };
        Self {
            site,
            devices,
            interrupted,
            fault,
        }
    }

    pub fn state(&self) -> &SiteState {
        self.site.state()
    }

    /// `true` if the site failed or halted on an internal error.
    pub fn is_failed(&self) -> bool {
        self.state().is_failed() || self.fault.is_some()
    }
}

/// Run-level summary, one entry per requested site in request order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub organization_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cancelled: bool,
    pub sites: Vec<SiteOutcome>,
}

impl RunReport {
    /// `true` only if every requested site reached `Active`.
    pub fn all_active(&self) -> bool {
        self.sites.iter().all(|s| s.state().is_active())
    }

    pub fn active_count(&self) -> usize {
        self.sites.iter().filter(|s| s.state().is_active()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.sites.iter().filter(|s| s.is_failed()).count()
    }

    pub fn interrupted_count(&self) -> usize {
        self.sites.iter().filter(|s| s.interrupted).count()
    }

    /// Address plans of the sites that reached `Active`.
    pub fn active_plans(&self) -> impl Iterator<Item = &SitePlan> {
        self.sites
            .iter()
            .filter(|s| s.state().is_active())
            .filter_map(|s| s.site.plan())
    }
}

// ── Orchestrator ─────────────────────────────────────────────────────

pub struct ProvisioningOrchestrator<R, S, D> {
    allocator: TopologyAllocator,
    verifier: IdentityVerifier<R>,
    sites: S,
    binder: InventoryBinder<D>,
    concurrency: usize,
}

impl<R, S, D> ProvisioningOrchestrator<R, S, D>
where
    R: ReachabilityClient,
    S: SiteCreationClient,
    D: DeviceClaimClient,
{
    pub fn new(
        layout: TopologyLayout,
        verifier: IdentityVerifier<R>,
        sites: S,
        binder: InventoryBinder<D>,
    ) -> Self {
        Self {
            allocator: TopologyAllocator::new(layout),
            verifier,
            sites,
            binder,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Maximum number of sites in flight at once (at least 1).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn allocator(&self) -> &TopologyAllocator {
        &self.allocator
    }

    /// Run the workflow for `requests`.
    ///
    /// Returns `Err` only if identity verification fails or is cancelled,
    /// in which case no site was touched. Every other failure, internal
    /// ones included, is recorded in the report against the site it
    /// concerns.
    pub async fn run(
        &self,
        credential: &SecretString,
        requests: &[SiteRequest],
        cancel: &CancellationToken,
    ) -> Result<RunReport, CoreError> {
        let started_at = Utc::now();
        info!(sites = requests.len(), concurrency = self.concurrency, "provisioning run starting");

        let session = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CoreError::Cancelled),
            result = self.verifier.verify(credential) => result?,
        };

        let mut results: Vec<(usize, SiteOutcome)> = stream::iter(requests.iter().enumerate())
            .map(|(index, request)| async move {
                (index, self.process_site(session, request, cancel).await)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        results.sort_by_key(|(index, _)| *index);

        let sites = results.into_iter().map(|(_, outcome)| outcome).collect();

        let report = RunReport {
            organization_id: session.organization_id,
            started_at,
            finished_at: Utc::now(),
            cancelled: cancel.is_cancelled(),
            sites,
        };
        info!(
            active = report.active_count(),
            failed = report.failed_count(),
            interrupted = report.interrupted_count(),
            "provisioning run finished"
        );
        Ok(report)
    }

    async fn process_site(
        &self,
        session: &SessionIdentity,
        request: &SiteRequest,
        cancel: &CancellationToken,
    ) -> SiteOutcome {
        let mut site = Site::requested(request);
        let mut devices = Vec::new();
        let driven = self
            .drive(session, request, &mut site, &mut devices, cancel)
            .await;
        let outcome = SiteOutcome::settle(site, devices, driven);

        match (outcome.state(), &outcome.fault) {
            (state, Some(fault)) => {
                warn!(site = %request.name, %state, %fault, "site halted");
            }
            (SiteState::Failed { stage, cause }, None) => {
                warn!(site = %request.name, %stage, %cause, "site failed");
            }
            (state, None) if outcome.interrupted => {
                warn!(site = %request.name, %state, "site interrupted");
            }
            (state, None) => info!(site = %request.name, %state, "site finished"),
        }
        outcome
    }

    /// Advance `site` as far as it goes. Returns `true` if cancellation
    /// stopped it short of a terminal state.
    async fn drive(
        &self,
        session: &SessionIdentity,
        request: &SiteRequest,
        site: &mut Site,
        devices: &mut Vec<DeviceOutcome>,
        cancel: &CancellationToken,
    ) -> Result<bool, CoreError> {
        if cancel.is_cancelled() {
            return Ok(true);
        }

        // Requested → AddressPlanned
        let plan = match self.allocator.site_plan(request.zone, request.site) {
            Ok(plan) => plan,
            Err(overflow) => {
                site.fail(FailureCause::Allocation(overflow))?;
                return Ok(false);
            }
        };
        site.assign_plan(plan.clone())?;

        // AddressPlanned → Provisioned
        let creation = SiteCreation {
            name: &request.name,
            zone: request.zone,
            plan: &plan,
            details: &request.details,
        };
        let created = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(true),
            result = self.sites.create_site(session, creation) => result,
        };
        match created {
            Ok(created) => site.mark_provisioned(created.site_id)?,
            Err(failure) => {
                site.fail(FailureCause::Remote(failure))?;
                return Ok(false);
            }
        }

        // Provisioned → HardwareBound: every device is attempted; the
        // first refusal becomes the site's failure cause.
        let mut first_refusal = None;
        for device in &request.devices {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(true),
                result = self.binder.claim(session, device, site) => result,
            };
            match result {
                Ok(claimed) => {
                    debug!(site = %request.name, device = %claimed.identity(), "device bound");
                    devices.push(DeviceOutcome::Bound(claimed));
                }
                Err(error) => {
                    warn!(site = %request.name, %device, %error, "device not bound");
                    first_refusal.get_or_insert_with(|| error.clone());
                    devices.push(DeviceOutcome::Rejected {
                        device: device.clone(),
                        error,
                    });
                }
            }
        }
        if let Some(error) = first_refusal {
            site.fail(FailureCause::Claim(error))?;
            return Ok(false);
        }
        site.mark_hardware_bound()?;

        // HardwareBound → Active
        site.activate()?;
        Ok(false)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{ClaimCode, DeviceIdentity, MacAddress};

    fn request() -> SiteRequest {
        SiteRequest::new("depot", 0, 3)
    }

    #[test]
    fn fault_keeps_site_and_bound_devices() {
        let mut site = Site::requested(&request());
        let bound = DeviceOutcome::Bound(ClaimedDevice::new(
            DeviceIdentity::ClaimCode(ClaimCode::parse("ABCDE12345FGHIJ").unwrap()),
            MacAddress::parse("5c5b35000001"),
            None,
            None,
            "depot".into(),
            Uuid::nil(),
        ));
        let fault = site.mark_provisioned(Uuid::nil()).unwrap_err();

        let outcome = SiteOutcome::settle(site, vec![bound], Err(fault));
        assert!(outcome.is_failed());
        assert!(!outcome.interrupted);
        assert_eq!(outcome.state(), &SiteState::Requested);
        assert_eq!(outcome.devices.len(), 1);
        assert!(outcome.fault.unwrap().contains("site 'depot' cannot move"));
    }

    #[test]
    fn interrupted_site_is_not_a_failure() {
        let outcome = SiteOutcome::settle(Site::requested(&request()), Vec::new(), Ok(true));
        assert!(outcome.interrupted);
        assert!(!outcome.is_failed());
        assert!(outcome.fault.is_none());
    }
}
