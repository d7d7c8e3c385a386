// Site endpoints
//
// Sites are org-scoped: `/api/v1/orgs/{org_id}/sites`.

use tracing::debug;
use uuid::Uuid;

use crate::client::ControllerClient;
use crate::error::Error;
use crate::models::{CreateSiteRequest, SiteInfo};

impl ControllerClient {
    /// Create a new site.
    ///
    /// `POST /api/v1/orgs/{org_id}/sites`
    pub async fn create_site(
        &self,
        org_id: Uuid,
        request: &CreateSiteRequest,
    ) -> Result<SiteInfo, Error> {
        let url = self.api_url(&format!("orgs/{org_id}/sites"))?;
        debug!(%org_id, name = %request.name, "creating site");
        self.post(url, request).await
    }
}
