// dayzero-core: Topology allocation and the provisioning workflow.

pub mod address;
pub mod allocator;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod identity;
pub mod inventory;
pub mod model;
pub mod orchestrator;
pub mod remote;

// ── Primary re-exports ──────────────────────────────────────────────
pub use address::AddressBlock;
pub use allocator::{
    AllocationPlan, FunctionalSubnet, SitePlan, SubnetPacker, SubnetSpec, TopologyAllocator,
    TopologyLayout, ZonePlan, ZoneSummary, allocate, allocate_functional_subnets, allocate_sites,
};
pub use config::{
    ConfigurationSource, ControllerConfig, DeploymentPlan, SiteDetails, SiteRequest,
    SiteTemplates, TlsVerification,
};
pub use controller::connect;
pub use error::{
    AddressError, AllocationLevel, AllocationOverflow, ClaimError, CoreError, IdentityError,
    OverflowKind, RemoteFailure,
};
pub use identity::{IdentityVerifier, PROVISIONING_CAPABILITIES};
pub use inventory::InventoryBinder;
pub use orchestrator::{
    DEFAULT_CONCURRENCY, DeviceOutcome, ProvisioningOrchestrator, RunReport, SiteOutcome,
};
pub use remote::{
    ClaimReceipt, DeviceClaimClient, OrgGrant, ProbeResponse, ReachabilityClient, SiteCreated,
    SiteCreation, SiteCreationClient,
};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Capability, ClaimCode, ClaimedDevice, DeviceIdentity, FailureCause, MacAddress,
    SessionIdentity, Site, SiteStage, SiteState, Transition,
};

pub use tokio_util::sync::CancellationToken;
