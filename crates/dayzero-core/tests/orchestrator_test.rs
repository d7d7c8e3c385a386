// Workflow tests for `ProvisioningOrchestrator` against in-memory collaborators.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use dayzero_core::{
    AllocationLevel, CancellationToken, ClaimError, ClaimReceipt, CoreError, DeviceClaimClient,
    DeviceIdentity, DeviceOutcome, FailureCause, IdentityError, IdentityVerifier,
    InventoryBinder, OrgGrant, ProbeResponse, ProvisioningOrchestrator, ReachabilityClient,
    RemoteFailure, SessionIdentity, SiteCreated, SiteCreation, SiteCreationClient, SiteRequest,
    SiteStage, SiteState, SubnetSpec, TopologyAllocator, TopologyLayout,
};

const ORG: Uuid = Uuid::from_u128(0x0a6);
const TAKEN: &str = "TAKEN12345ABCDE";

// ── Fake controller ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Probe,
    CreateSite(String),
    Claim(String),
}

struct FakeController {
    authenticated: bool,
    role: &'static str,
    rejected_sites: HashSet<String>,
    unreachable_sites: HashSet<String>,
    cancel_on_create: Option<CancellationToken>,
    /// Cancel and hang when this device is claimed.
    cancel_on_claim: Option<(&'static str, CancellationToken)>,
    next_site_id: AtomicU32,
    calls: Mutex<Vec<Call>>,
}

impl Default for FakeController {
    fn default() -> Self {
        Self {
            authenticated: true,
            role: "admin",
            rejected_sites: HashSet::new(),
            unreachable_sites: HashSet::new(),
            cancel_on_create: None,
            cancel_on_claim: None,
            next_site_id: AtomicU32::new(1),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeController {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn mutations(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| !matches!(c, Call::Probe))
            .count()
    }
}

impl ReachabilityClient for FakeController {
    async fn probe(&self, _: &SecretString) -> Result<ProbeResponse, RemoteFailure> {
        self.record(Call::Probe);
        if !self.authenticated {
            return Ok(ProbeResponse::rejected());
        }
        Ok(ProbeResponse {
            authenticated: true,
            email: Some("ops@example.com".into()),
            grants: vec![OrgGrant {
                org_id: ORG,
                name: Some("Acme".into()),
                role: self.role.into(),
            }],
        })
    }
}

impl SiteCreationClient for FakeController {
    async fn create_site(
        &self,
        _: &SessionIdentity,
        site: SiteCreation<'_>,
    ) -> Result<SiteCreated, RemoteFailure> {
        self.record(Call::CreateSite(site.name.to_owned()));
        if let Some(token) = &self.cancel_on_create {
            token.cancel();
            std::future::pending::<()>().await;
        }
        if self.rejected_sites.contains(site.name) {
            return Err(RemoteFailure::Rejection {
                status: Some(400),
                reason: "site name already exists".into(),
            });
        }
        if self.unreachable_sites.contains(site.name) {
            return Err(RemoteFailure::transport("connection reset by peer"));
        }
        let id = self.next_site_id.fetch_add(1, Ordering::SeqCst);
        Ok(SiteCreated {
            site_id: Uuid::from_u128(u128::from(id)),
        })
    }
}

impl DeviceClaimClient for FakeController {
    async fn claim(
        &self,
        _: &SessionIdentity,
        device: &DeviceIdentity,
        _: Uuid,
    ) -> Result<ClaimReceipt, RemoteFailure> {
        self.record(Call::Claim(device.to_string()));
        if let Some((code, token)) = &self.cancel_on_claim {
            if device.to_string() == *code {
                token.cancel();
                std::future::pending::<()>().await;
            }
        }
        Ok(ClaimReceipt {
            claimed: device.to_string() != TAKEN,
            ..ClaimReceipt::default()
        })
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn layout() -> TopologyLayout {
    TopologyLayout {
        supernet: "10.0.0.0/8".parse().unwrap(),
        zone_count: 8,
        zone_prefix: 11,
        sites_per_zone: 16,
        site_prefix: 22,
        subnets: vec![SubnetSpec::new("mgmt", 50), SubnetSpec::new("client", 500)],
    }
}

fn orchestrator(
    fake: &FakeController,
) -> ProvisioningOrchestrator<&FakeController, &FakeController, &FakeController> {
    ProvisioningOrchestrator::new(
        layout(),
        IdentityVerifier::new(fake),
        fake,
        InventoryBinder::new(fake),
    )
}

fn key() -> SecretString {
    SecretString::from("api-token".to_owned())
}

// ── Happy path ──────────────────────────────────────────────────────

#[tokio::test]
async fn all_sites_reach_active() {
    let fake = FakeController::default();
    let requests = vec![
        SiteRequest::new("hq", 0, 0).with_devices(["ABCDE12345FGHIJ", "5c:5b:35:00:00:01"]),
        SiteRequest::new("branch", 3, 7).with_devices(["KLMNO67890PQRST"]),
    ];

    let report = assert_ok!(
        orchestrator(&fake)
            .with_concurrency(1)
            .run(&key(), &requests, &CancellationToken::new())
            .await
    );

    assert!(report.all_active());
    assert_eq!(report.organization_id, ORG);
    assert!(!report.cancelled);

    let hq = &report.sites[0];
    let stages: Vec<_> = hq.site.history().iter().map(|t| t.to).collect();
    assert_eq!(
        stages,
        [
            SiteStage::AddressPlanned,
            SiteStage::Provisioned,
            SiteStage::HardwareBound,
            SiteStage::Active
        ]
    );
    assert_eq!(hq.devices.len(), 2);
    assert!(hq.devices.iter().all(DeviceOutcome::is_bound));

    let plans: Vec<_> = report.active_plans().map(|p| p.block.to_string()).collect();
    assert_eq!(plans, ["10.0.0.0/22", "10.96.28.0/22"]);

    assert_eq!(
        fake.calls(),
        [
            Call::Probe,
            Call::CreateSite("hq".into()),
            Call::Claim("ABCDE12345FGHIJ".into()),
            Call::Claim("5c:5b:35:00:00:01".into()),
            Call::CreateSite("branch".into()),
            Call::Claim("KLMNO67890PQRST".into()),
        ]
    );
}

// ── Identity gate ───────────────────────────────────────────────────

#[tokio::test]
async fn rejected_credential_blocks_every_mutation() {
    let fake = FakeController {
        authenticated: false,
        ..FakeController::default()
    };
    let requests = vec![SiteRequest::new("hq", 0, 0).with_devices(["ABCDE12345FGHIJ"])];

    let err = assert_err!(
        orchestrator(&fake)
            .run(&key(), &requests, &CancellationToken::new())
            .await
    );

    assert!(matches!(
        err,
        CoreError::Identity(IdentityError::Unauthenticated)
    ));
    assert_eq!(fake.calls(), [Call::Probe]);
}

#[tokio::test]
async fn read_only_role_blocks_every_mutation() {
    let fake = FakeController {
        role: "read",
        ..FakeController::default()
    };
    let requests = vec![SiteRequest::new("hq", 0, 0)];

    let err = assert_err!(
        orchestrator(&fake)
            .run(&key(), &requests, &CancellationToken::new())
            .await
    );

    assert!(matches!(
        err,
        CoreError::Identity(IdentityError::InsufficientPermissions { .. })
    ));
    assert_eq!(fake.mutations(), 0);
}

// ── Per-site failures ───────────────────────────────────────────────

#[tokio::test]
async fn failed_site_creation_does_not_affect_other_sites() {
    let fake = FakeController {
        rejected_sites: HashSet::from(["branch".to_owned()]),
        ..FakeController::default()
    };
    let requests = vec![
        SiteRequest::new("hq", 0, 0).with_devices(["ABCDE12345FGHIJ"]),
        SiteRequest::new("branch", 0, 1).with_devices(["KLMNO67890PQRST"]),
        SiteRequest::new("depot", 1, 0),
    ];

    let report = orchestrator(&fake)
        .run(&key(), &requests, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!report.all_active());
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.active_count(), 2);

    let branch = &report.sites[1];
    match branch.state() {
        SiteState::Failed { stage, cause } => {
            assert_eq!(*stage, SiteStage::Provisioned);
            assert!(matches!(
                cause,
                FailureCause::Remote(RemoteFailure::Rejection { status: Some(400), .. })
            ));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(branch.devices.is_empty());
    assert!(branch.site.remote_id().is_none());

    let allocator = TopologyAllocator::new(layout());
    assert_eq!(report.sites[0].state(), &SiteState::Active);
    assert_eq!(
        report.sites[0].site.plan(),
        Some(&allocator.site_plan(0, 0).unwrap())
    );
    assert_eq!(report.sites[2].state(), &SiteState::Active);

    assert!(!fake.calls().contains(&Call::Claim("KLMNO67890PQRST".into())));
}

#[tokio::test]
async fn transport_failure_at_creation_fails_only_that_site() {
    let fake = FakeController {
        unreachable_sites: HashSet::from(["branch".to_owned()]),
        ..FakeController::default()
    };
    let requests = vec![
        SiteRequest::new("hq", 0, 0),
        SiteRequest::new("branch", 0, 1).with_devices(["KLMNO67890PQRST"]),
    ];

    let report = orchestrator(&fake)
        .run(&key(), &requests, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.active_count(), 1);
    assert_eq!(report.failed_count(), 1);

    let branch = &report.sites[1];
    assert_eq!(
        branch.state(),
        &SiteState::Failed {
            stage: SiteStage::Provisioned,
            cause: FailureCause::Remote(RemoteFailure::Transport {
                reason: "connection reset by peer".into()
            }),
        }
    );
    assert!(branch.site.remote_id().is_none());
    assert!(branch.devices.is_empty());
    assert!(!branch.interrupted);
    assert!(!fake.calls().contains(&Call::Claim("KLMNO67890PQRST".into())));
}

#[tokio::test]
async fn already_claimed_device_fails_site_after_trying_all_devices() {
    let fake = FakeController::default();
    let requests = vec![
        SiteRequest::new("hq", 0, 0).with_devices([TAKEN, "ABCDE12345FGHIJ", "bogus"]),
    ];

    let report = orchestrator(&fake)
        .run(&key(), &requests, &CancellationToken::new())
        .await
        .unwrap();

    let hq = &report.sites[0];
    assert_eq!(
        hq.state(),
        &SiteState::Failed {
            stage: SiteStage::HardwareBound,
            cause: FailureCause::Claim(ClaimError::AlreadyClaimed {
                device: TAKEN.into()
            }),
        }
    );
    // Left provisioned on the controller for manual remediation.
    assert!(hq.site.remote_id().is_some());

    assert_eq!(hq.devices.len(), 3);
    assert!(!hq.devices[0].is_bound());
    assert!(hq.devices[1].is_bound());
    assert!(matches!(
        &hq.devices[2],
        DeviceOutcome::Rejected {
            error: ClaimError::InvalidClaimCode { .. },
            ..
        }
    ));

    let claims = fake
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Claim(_)))
        .count();
    assert_eq!(claims, 2);
}

#[tokio::test]
async fn allocation_overflow_fails_only_that_site() {
    let fake = FakeController::default();
    let requests = vec![
        SiteRequest::new("nowhere", 8, 0),
        SiteRequest::new("hq", 0, 0),
        SiteRequest::new("overbooked", 0, 16),
    ];

    let report = orchestrator(&fake)
        .run(&key(), &requests, &CancellationToken::new())
        .await
        .unwrap();

    for (index, level) in [(0, AllocationLevel::Zone), (2, AllocationLevel::Site)] {
        match report.sites[index].state() {
            SiteState::Failed {
                stage: SiteStage::AddressPlanned,
                cause: FailureCause::Allocation(overflow),
            } => assert_eq!(overflow.level, level),
            other => panic!("expected allocation failure, got {other:?}"),
        }
        assert!(report.sites[index].site.plan().is_none());
    }
    assert!(report.sites[1].state().is_active());
    assert_eq!(
        fake.calls(),
        [Call::Probe, Call::CreateSite("hq".into())]
    );
}

// ── Cancellation ────────────────────────────────────────────────────

#[tokio::test]
async fn cancelled_before_identity_touches_nothing() {
    let fake = FakeController::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = assert_err!(
        orchestrator(&fake)
            .run(&key(), &[SiteRequest::new("hq", 0, 0)], &cancel)
            .await
    );

    assert!(matches!(err, CoreError::Cancelled));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn cancellation_keeps_last_recorded_state() {
    let cancel = CancellationToken::new();
    let fake = FakeController {
        cancel_on_create: Some(cancel.clone()),
        ..FakeController::default()
    };
    let requests = vec![
        SiteRequest::new("hq", 0, 0).with_devices(["ABCDE12345FGHIJ"]),
        SiteRequest::new("branch", 0, 1),
    ];

    let report = orchestrator(&fake)
        .with_concurrency(1)
        .run(&key(), &requests, &cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert!(!report.all_active());
    assert_eq!(report.interrupted_count(), 2);
    assert_eq!(report.failed_count(), 0);

    assert_eq!(report.sites[0].state(), &SiteState::AddressPlanned);
    assert!(report.sites[0].site.plan().is_some());
    assert_eq!(report.sites[1].state(), &SiteState::Requested);
    assert!(!fake.calls().contains(&Call::CreateSite("branch".into())));
}

#[tokio::test]
async fn cancellation_during_binding_keeps_bound_devices() {
    let cancel = CancellationToken::new();
    let fake = FakeController {
        cancel_on_claim: Some(("KLMNO67890PQRST", cancel.clone())),
        ..FakeController::default()
    };
    let requests = vec![
        SiteRequest::new("hq", 0, 0).with_devices([
            "ABCDE12345FGHIJ",
            "KLMNO67890PQRST",
            "UVWXY13579ZABCD",
        ]),
    ];

    let report = orchestrator(&fake)
        .run(&key(), &requests, &cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    let hq = &report.sites[0];
    assert!(hq.interrupted);
    assert_eq!(hq.state(), &SiteState::Provisioned);
    assert!(hq.site.remote_id().is_some());
    assert_eq!(hq.devices.len(), 1);
    assert!(hq.devices[0].is_bound());
    assert_eq!(report.failed_count(), 0);
    assert!(!fake.calls().contains(&Call::Claim("UVWXY13579ZABCD".into())));
}

// ── Ordering ────────────────────────────────────────────────────────

#[tokio::test]
async fn report_preserves_request_order() {
    let fake = FakeController::default();
    let requests: Vec<_> = (0..12u32)
        .map(|i| SiteRequest::new(format!("site-{i:02}"), i % 8, i / 8))
        .collect();

    let report = orchestrator(&fake)
        .with_concurrency(5)
        .run(&key(), &requests, &CancellationToken::new())
        .await
        .unwrap();

    let names: Vec<_> = report.sites.iter().map(|s| s.site.name().to_owned()).collect();
    let expected: Vec<_> = requests.iter().map(|r| r.name.clone()).collect();
    assert_eq!(names, expected);
    assert!(report.all_active());
}
