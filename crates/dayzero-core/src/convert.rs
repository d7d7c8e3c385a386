// ── API-to-domain bridges ──
//
// Implements the collaborator traits on `dayzero_api::ControllerClient`:
// wire responses become `ProbeResponse`, `SiteCreated` and `ClaimReceipt`,
// and site plans become controller site variables.

use std::collections::BTreeMap;

use secrecy::SecretString;
use tracing::debug;
use uuid::Uuid;

use dayzero_api::{
    AssignResponse, ClaimResponse, ControllerClient, CreateSiteRequest, InventoryItem, SelfInfo,
};

use crate::allocator::SitePlan;
use crate::error::RemoteFailure;
use crate::model::{ClaimCode, DeviceIdentity, MacAddress, SessionIdentity};
use crate::remote::{
    ClaimReceipt, DeviceClaimClient, OrgGrant, ProbeResponse, ReachabilityClient, SiteCreated,
    SiteCreation, SiteCreationClient,
};

// ── Helpers ────────────────────────────────────────────────────────

/// Phrases the controller uses when hardware belongs elsewhere.
const OWNERSHIP_CONFLICTS: &[&str] = &[
    "already claimed",
    "already assigned",
    "assigned to another",
    "claimed by another",
];

/// Anything not worded as an ownership conflict is an ordinary rejection.
fn is_ownership_conflict(reason: &str) -> bool {
    let reason = reason.to_ascii_lowercase();
    OWNERSHIP_CONFLICTS
        .iter()
        .any(|phrase| reason.contains(phrase))
}

/// Reason reported for the `index`-th entry of an `error` list.
fn reason_at(reasons: &[String], index: usize) -> String {
    reasons
        .get(index)
        .cloned()
        .unwrap_or_else(|| "rejected without a reason".into())
}

// ── Probe ──────────────────────────────────────────────────────────

impl From<SelfInfo> for ProbeResponse {
    fn from(info: SelfInfo) -> Self {
        let grants = info
            .privileges
            .into_iter()
            .filter(|p| p.scope == "org")
            .filter_map(|p| {
                Some(OrgGrant {
                    org_id: p.org_id?,
                    name: p.name,
                    role: p.role,
                })
            })
            .collect();

        Self {
            authenticated: true,
            email: info.email,
            grants,
        }
    }
}

impl ReachabilityClient for ControllerClient {
    async fn probe(&self, credential: &SecretString) -> Result<ProbeResponse, RemoteFailure> {
        match self.whoami(credential).await {
            Ok(info) => Ok(info.into()),
            Err(e) if e.is_auth_failure() => {
                debug!(error = %e, "credential rejected");
                Ok(ProbeResponse::rejected())
            }
            Err(e) => Err(e.into()),
        }
    }
}

// ── Site creation ──────────────────────────────────────────────────

/// Site variables carrying the address plan: `site_block`, `zone_block`
/// and a `<name>_subnet` / `<name>_gateway` pair per functional subnet.
pub fn site_vars(plan: &SitePlan) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    vars.insert("site_block".into(), plan.block.to_string());
    vars.insert("zone_block".into(), plan.zone_block.to_string());
    for subnet in &plan.subnets {
        vars.insert(format!("{}_subnet", subnet.name), subnet.block.to_string());
        vars.insert(format!("{}_gateway", subnet.name), subnet.gateway.to_string());
    }
    vars
}

impl From<SiteCreation<'_>> for CreateSiteRequest {
    fn from(site: SiteCreation<'_>) -> Self {
        let notes = site
            .details
            .notes
            .clone()
            .unwrap_or_else(|| format!("zone {} site {}", site.zone, site.plan.site));
        let templates = site.details.templates;

        Self {
            name: site.name.to_owned(),
            timezone: site.details.timezone.clone(),
            country_code: site.details.country_code.clone(),
            address: site.details.address.clone(),
            notes: Some(notes),
            gatewaytemplate_id: templates.gateway_template,
            networktemplate_id: templates.network_template,
            rftemplate_id: templates.rf_template,
            secpolicy_id: templates.security_policy,
            alarmtemplate_id: templates.alarm_template,
            vars: site_vars(site.plan),
        }
    }
}

impl SiteCreationClient for ControllerClient {
    async fn create_site(
        &self,
        session: &SessionIdentity,
        site: SiteCreation<'_>,
    ) -> Result<SiteCreated, RemoteFailure> {
        let request = CreateSiteRequest::from(site);
        let info = ControllerClient::create_site(self, session.organization_id, &request).await?;
        Ok(SiteCreated { site_id: info.id })
    }
}

// ── Device claim ───────────────────────────────────────────────────

/// Outcome of claiming one code into the organization inventory.
enum CodeClaim {
    /// In our inventory now (newly added or already there).
    InInventory(InventoryItem),
    /// Owned by someone else.
    Conflict,
}

fn code_claim(response: ClaimResponse, code: &ClaimCode) -> Result<CodeClaim, RemoteFailure> {
    let is_code = |c: &String| c.eq_ignore_ascii_case(code.as_str());

    if let Some(index) = response.error.iter().position(is_code) {
        let reason = reason_at(&response.reason, index);
        return if is_ownership_conflict(&reason) {
            Ok(CodeClaim::Conflict)
        } else {
            Err(RemoteFailure::rejection(reason))
        };
    }

    let mut items: Vec<_> = response
        .inventory_added
        .into_iter()
        .chain(response.inventory_duplicated)
        .collect();
    // `magic` echoes the claim code; a lone record is ours even without it.
    let position = items
        .iter()
        .position(|item| item.magic.as_ref().is_some_and(is_code))
        .or((items.len() == 1).then_some(0));

    position
        .map(|i| CodeClaim::InInventory(items.swap_remove(i)))
        .ok_or_else(|| {
            RemoteFailure::rejection(format!("no inventory record returned for claim code {code}"))
        })
}

/// `true` when assigned, `false` on an ownership conflict.
fn assign_outcome(response: &AssignResponse, mac: &MacAddress) -> Result<bool, RemoteFailure> {
    let is_mac = |m: &String| MacAddress::parse(m).as_ref() == Some(mac);

    if response.success.iter().any(is_mac) {
        return Ok(true);
    }
    if let Some(index) = response.error.iter().position(is_mac) {
        let reason = reason_at(&response.reason, index);
        return if is_ownership_conflict(&reason) {
            Ok(false)
        } else {
            Err(RemoteFailure::rejection(reason))
        };
    }
    Err(RemoteFailure::rejection(format!(
        "controller did not acknowledge assignment of {mac}"
    )))
}

impl DeviceClaimClient for ControllerClient {
    async fn claim(
        &self,
        session: &SessionIdentity,
        device: &DeviceIdentity,
        site_id: Uuid,
    ) -> Result<ClaimReceipt, RemoteFailure> {
        let org_id = session.organization_id;
        let mut receipt = ClaimReceipt::default();

        let mac = match device {
            DeviceIdentity::Mac(mac) => mac.clone(),
            DeviceIdentity::ClaimCode(code) => {
                let response = self
                    .claim_inventory(org_id, &[code.as_str().to_owned()])
                    .await?;
                let item = match code_claim(response, code)? {
                    CodeClaim::InInventory(item) => item,
                    CodeClaim::Conflict => return Ok(receipt),
                };
                let mac = MacAddress::parse(&item.mac).ok_or_else(|| {
                    RemoteFailure::rejection(format!(
                        "controller returned malformed MAC '{}' for {code}",
                        item.mac
                    ))
                })?;
                receipt.serial = item.serial;
                receipt.model = item.model;
                mac
            }
        };

        let response = self
            .assign_inventory(org_id, site_id, vec![mac.as_str().to_owned()])
            .await?;
        receipt.claimed = assign_outcome(&response, &mac)?;
        receipt.mac = Some(mac);
        Ok(receipt)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(mac: &str, magic: &str) -> InventoryItem {
        InventoryItem {
            mac: mac.into(),
            serial: Some("A0123".into()),
            model: Some("AP45".into()),
            magic: Some(magic.into()),
            device_type: Some("ap".into()),
            site_id: None,
        }
    }

    #[test]
    fn probe_keeps_only_org_grants() {
        let info: SelfInfo = serde_json::from_value(serde_json::json!({
            "email": "ops@example.com",
            "privileges": [
                {"scope": "org", "role": "admin", "org_id": "6f4bf402-45f9-4b8f-a5a7-5b3c7d6f0a11", "name": "Acme"},
                {"scope": "site", "role": "write", "site_id": "0b6c6ad8-1c1e-4f0e-9d4c-2a7f3b9a7c55"},
                {"scope": "org", "role": "read"}
            ]
        }))
        .unwrap();

        let probe = ProbeResponse::from(info);
        assert!(probe.authenticated);
        assert_eq!(probe.grants.len(), 1);
        assert_eq!(probe.grants[0].role, "admin");
        assert_eq!(probe.grants[0].name.as_deref(), Some("Acme"));
    }

    #[test]
    fn duplicated_codes_are_already_in_inventory() {
        let code = ClaimCode::parse("ABCDE12345FGHIJ").unwrap();
        let response = ClaimResponse {
            duplicated: vec!["ABCDE12345FGHIJ".into()],
            inventory_duplicated: vec![item("5c5b35000001", "ABCDE12345FGHIJ")],
            ..ClaimResponse::default()
        };
        assert!(matches!(
            code_claim(response, &code).unwrap(),
            CodeClaim::InInventory(_)
        ));
    }

    #[test]
    fn foreign_codes_are_conflicts() {
        let code = ClaimCode::parse("ABCDE12345FGHIJ").unwrap();
        let response = ClaimResponse {
            error: vec!["ABCDE12345FGHIJ".into()],
            reason: vec!["already claimed by another org".into()],
            ..ClaimResponse::default()
        };
        assert!(matches!(
            code_claim(response, &code).unwrap(),
            CodeClaim::Conflict
        ));

        let response = ClaimResponse {
            error: vec!["ABCDE12345FGHIJ".into()],
            reason: vec!["invalid code".into()],
            ..ClaimResponse::default()
        };
        assert!(code_claim(response, &code).is_err());
    }

    #[test]
    fn assignment_outcomes() {
        let mac = MacAddress::parse("5c5b35000001").unwrap();
        let ok = AssignResponse {
            success: vec!["5c5b35000001".into()],
            ..AssignResponse::default()
        };
        assert!(assign_outcome(&ok, &mac).unwrap());

        let conflict = AssignResponse {
            error: vec!["5c5b35000001".into()],
            reason: vec!["device is assigned to another site".into()],
            ..AssignResponse::default()
        };
        assert!(!assign_outcome(&conflict, &mac).unwrap());

        assert!(assign_outcome(&AssignResponse::default(), &mac).is_err());
    }

    #[test]
    fn unrelated_reasons_mentioning_claims_are_rejections() {
        let mac = MacAddress::parse("5c5b35000001").unwrap();
        let missing_site = AssignResponse {
            error: vec!["5c5b35000001".into()],
            reason: vec!["site not found, device could not be assigned".into()],
            ..AssignResponse::default()
        };
        let err = assign_outcome(&missing_site, &mac).unwrap_err();
        assert!(matches!(err, RemoteFailure::Rejection { .. }));

        let code = ClaimCode::parse("ABCDE12345FGHIJ").unwrap();
        let response = ClaimResponse {
            error: vec!["ABCDE12345FGHIJ".into()],
            reason: vec!["code cannot be claimed: unknown model".into()],
            ..ClaimResponse::default()
        };
        assert!(code_claim(response, &code).is_err());
    }

    #[test]
    fn ownership_phrases_are_conflicts() {
        assert!(is_ownership_conflict("Already Claimed"));
        assert!(is_ownership_conflict("device already assigned"));
        assert!(is_ownership_conflict("claimed by another org"));
        assert!(!is_ownership_conflict("unclaimed device"));
        assert!(!is_ownership_conflict("could not be assigned"));
    }
}
