// Inventory endpoints
//
// Claiming moves hardware into the organization inventory; assigning
// binds inventory to a site. Both live under `/api/v1/orgs/{org_id}/inventory`.

use tracing::debug;
use uuid::Uuid;

use crate::client::ControllerClient;
use crate::error::Error;
use crate::models::{AssignRequest, AssignResponse, ClaimResponse};

impl ControllerClient {
    /// Claim devices into the organization by claim code.
    ///
    /// `POST /api/v1/orgs/{org_id}/inventory` with a JSON array of codes.
    pub async fn claim_inventory(
        &self,
        org_id: Uuid,
        codes: &[String],
    ) -> Result<ClaimResponse, Error> {
        let url = self.api_url(&format!("orgs/{org_id}/inventory"))?;
        debug!(%org_id, count = codes.len(), "claiming inventory");
        self.post(url, &codes).await
    }

    /// Assign inventory devices (by MAC) to a site without reassigning
    /// devices that already belong to another site.
    ///
    /// `PUT /api/v1/orgs/{org_id}/inventory` with `{"op": "assign", ...}`
    pub async fn assign_inventory(
        &self,
        org_id: Uuid,
        site_id: Uuid,
        macs: Vec<String>,
    ) -> Result<AssignResponse, Error> {
        let url = self.api_url(&format!("orgs/{org_id}/inventory"))?;
        debug!(%org_id, %site_id, count = macs.len(), "assigning inventory");
        self.put(url, &AssignRequest::assign(site_id, macs)).await
    }
}
