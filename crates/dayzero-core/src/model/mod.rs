// ── Domain model ──

pub mod device;
pub mod session;
pub mod site;

pub use device::{ClaimCode, ClaimedDevice, DeviceIdentity, MacAddress};
pub use session::{Capability, SessionIdentity};
pub use site::{FailureCause, Site, SiteStage, SiteState, Transition};
