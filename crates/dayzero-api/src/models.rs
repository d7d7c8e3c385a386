// Controller API request/response types
//
// Fields use `#[serde(default)]` liberally: the controller omits empty
// lists and optional attributes rather than sending nulls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Self ─────────────────────────────────────────────────────────────

/// Response of `GET /api/v1/self`: who the token belongs to and what it
/// may touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub privileges: Vec<Privilege>,
}

/// A single privilege grant. `scope` is `"org"`, `"site"` or `"msp"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Privilege {
    pub scope: String,
    /// `"admin"`, `"write"`, `"read"`, `"installer"`, `"helpdesk"`, ...
    pub role: String,
    #[serde(default)]
    pub org_id: Option<Uuid>,
    #[serde(default)]
    pub site_id: Option<Uuid>,
    /// Display name of the org or site the grant applies to.
    #[serde(default)]
    pub name: Option<String>,
}

// ── Sites ────────────────────────────────────────────────────────────

/// Body of `POST /api/v1/orgs/{org_id}/sites`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSiteRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gatewaytemplate_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub networktemplate_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rftemplate_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secpolicy_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarmtemplate_id: Option<Uuid>,
    /// Site variables consumed by templates (`{{mgmt_subnet}}` etc.).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, String>,
}

/// A site as returned by the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteInfo {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub org_id: Option<Uuid>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

// ── Inventory ────────────────────────────────────────────────────────

/// Response of `POST /api/v1/orgs/{org_id}/inventory` (claim by code).
///
/// Each submitted code lands in exactly one of `added`, `duplicated`
/// or `error`; `reason` is parallel to `error`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimResponse {
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub duplicated: Vec<String>,
    #[serde(default)]
    pub error: Vec<String>,
    #[serde(default)]
    pub reason: Vec<String>,
    #[serde(default)]
    pub inventory_added: Vec<InventoryItem>,
    #[serde(default)]
    pub inventory_duplicated: Vec<InventoryItem>,
}

/// A device in the organization inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub mac: String,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// The claim code the device was claimed with.
    #[serde(default)]
    pub magic: Option<String>,
    #[serde(default, rename = "type")]
    pub device_type: Option<String>,
    #[serde(default)]
    pub site_id: Option<Uuid>,
}

/// Body of `PUT /api/v1/orgs/{org_id}/inventory`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRequest {
    pub op: String,
    pub site_id: Uuid,
    pub macs: Vec<String>,
    pub managed: bool,
    /// When set, the controller refuses to move a device that is
    /// already assigned to another site.
    pub no_reassign: bool,
}

impl AssignRequest {
    /// An `assign` operation that never moves an already-assigned device.
    pub fn assign(site_id: Uuid, macs: Vec<String>) -> Self {
        Self {
            op: "assign".into(),
            site_id,
            macs,
            managed: true,
            no_reassign: true,
        }
    }
}

/// Response of an inventory `assign` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignResponse {
    #[serde(default)]
    pub success: Vec<String>,
    #[serde(default)]
    pub error: Vec<String>,
    #[serde(default)]
    pub reason: Vec<String>,
}
