// Token introspection endpoint
//
// `GET /api/v1/self` is the cheapest authenticated call the controller
// offers; it doubles as the reachability probe.

use secrecy::SecretString;
use tracing::debug;

use crate::client::ControllerClient;
use crate::error::Error;
use crate::models::SelfInfo;

impl ControllerClient {
    /// Describe the owner of `token` and its privileges.
    ///
    /// `GET /api/v1/self`
    pub async fn whoami(&self, token: &SecretString) -> Result<SelfInfo, Error> {
        let url = self.api_url("self")?;
        debug!("probing token identity");
        self.get_with_token(url, token).await
    }
}
