// ── Identity verification ──
//
// One reachability round-trip per run. A successful handshake is cached
// for the verifier's lifetime; failures are not, and nothing here retries.

use std::collections::BTreeSet;

use chrono::Utc;
use secrecy::SecretString;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::IdentityError;
use crate::model::{Capability, SessionIdentity};
use crate::remote::{OrgGrant, ReachabilityClient};

/// Capabilities a provisioning run needs.
pub const PROVISIONING_CAPABILITIES: [Capability; 2] =
    [Capability::ManageSites, Capability::ClaimInventory];

pub struct IdentityVerifier<R> {
    client: R,
    pinned_org: Option<Uuid>,
    required: Vec<Capability>,
    session: OnceCell<SessionIdentity>,
}

impl<R: ReachabilityClient> IdentityVerifier<R> {
    /// A verifier requiring the provisioning capabilities.
    pub fn new(client: R) -> Self {
        Self {
            client,
            pinned_org: None,
            required: PROVISIONING_CAPABILITIES.to_vec(),
            session: OnceCell::new(),
        }
    }

    /// Require the credential to grant access to this organization.
    #[must_use]
    pub fn with_organization(mut self, org_id: Option<Uuid>) -> Self {
        self.pinned_org = org_id;
        self
    }

    /// Replace the required capability set.
    #[must_use]
    pub fn requiring(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.required = capabilities.into_iter().collect();
        self
    }

    /// The cached session, if [`verify`](Self::verify) has succeeded.
    pub fn session(&self) -> Option<&SessionIdentity> {
        self.session.get()
    }

    pub async fn verify(&self, credential: &SecretString) -> Result<&SessionIdentity, IdentityError> {
        self.session
            .get_or_try_init(|| self.handshake(credential))
            .await
    }

    async fn handshake(&self, credential: &SecretString) -> Result<SessionIdentity, IdentityError> {
        debug!("probing controller");
        let probe = self.client.probe(credential).await?;
        if !probe.authenticated {
            return Err(IdentityError::Unauthenticated);
        }

        let grant = resolve_organization(self.pinned_org, &probe.grants)?;
        let session = SessionIdentity {
            organization_id: grant.org_id,
            organization_name: grant.name.clone(),
            email: probe.email,
            role: grant.role.clone(),
            capabilities: Capability::for_role(&grant.role),
            verified_at: Utc::now(),
        };

        let missing = session.missing(&self.required);
        if !missing.is_empty() {
            return Err(IdentityError::InsufficientPermissions {
                role: session.role,
                missing,
            });
        }

        info!(
            org_id = %session.organization_id,
            role = %session.role,
            "identity verified"
        );
        Ok(session)
    }
}

fn resolve_organization(
    pinned: Option<Uuid>,
    grants: &[OrgGrant],
) -> Result<&OrgGrant, IdentityError> {
    if let Some(org_id) = pinned {
        return grants
            .iter()
            .find(|g| g.org_id == org_id)
            .ok_or_else(|| IdentityError::UnknownOrganization {
                reason: format!("credential has no access to organization {org_id}"),
            });
    }

    let orgs: BTreeSet<Uuid> = grants.iter().map(|g| g.org_id).collect();
    match (orgs.len(), grants.first()) {
        (1, Some(grant)) => Ok(grant),
        (0, _) => Err(IdentityError::UnknownOrganization {
            reason: "credential is not scoped to any organization".into(),
        }),
        (n, _) => Err(IdentityError::UnknownOrganization {
            reason: format!("credential grants access to {n} organizations; pin one with org_id"),
        }),
    }
}
