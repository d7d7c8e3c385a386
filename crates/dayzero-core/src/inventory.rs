// ── Inventory binding ──
//
// Attaches hardware to a provisioned site. The controller is the only
// authority on whether a device already belongs elsewhere; the binder
// keeps no ledger of its own and never retries a refused claim.

use tracing::{debug, warn};

use crate::error::ClaimError;
use crate::model::{ClaimedDevice, DeviceIdentity, SessionIdentity, Site, SiteState};
use crate::remote::DeviceClaimClient;

pub struct InventoryBinder<D> {
    client: D,
}

impl<D: DeviceClaimClient> InventoryBinder<D> {
    pub fn new(client: D) -> Self {
        Self { client }
    }

    /// Bind `device` (a claim code or MAC) to `site`, which must be
    /// `Provisioned`.
    pub async fn claim(
        &self,
        session: &SessionIdentity,
        device: &str,
        site: &Site,
    ) -> Result<ClaimedDevice, ClaimError> {
        let identity = DeviceIdentity::parse(device)?;
        let site_id = match (site.state(), site.remote_id()) {
            (SiteState::Provisioned, Some(id)) => id,
            (state, _) => {
                return Err(ClaimError::SiteNotReady {
                    site: site.name().to_owned(),
                    stage: state.stage(),
                });
            }
        };

        debug!(site = site.name(), device = %identity, "claiming device");
        let receipt = self.client.claim(session, &identity, site_id).await?;
        if !receipt.claimed {
            warn!(site = site.name(), device = %identity, "device already claimed elsewhere");
            return Err(ClaimError::AlreadyClaimed {
                device: identity.to_string(),
            });
        }

        let mac = receipt.mac.or_else(|| match &identity {
            DeviceIdentity::Mac(mac) => Some(mac.clone()),
            DeviceIdentity::ClaimCode(_) => None,
        });
        Ok(ClaimedDevice::new(
            identity,
            mac,
            receipt.serial,
            receipt.model,
            site.name().to_owned(),
            site_id,
        ))
    }
}
