// ── Session identity ──

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{Display, EnumIter, IntoEnumIterator};
use uuid::Uuid;

/// What a verified credential is allowed to do.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Capability {
    Read,
    ManageSites,
    ClaimInventory,
}

impl Capability {
    /// Capabilities implied by a controller role name.
    ///
    /// Unknown roles are read-only rather than rejected.
    pub fn for_role(role: &str) -> BTreeSet<Self> {
        match role.to_ascii_lowercase().as_str() {
            "admin" | "write" => Self::iter().collect(),
            "installer" => BTreeSet::from([Self::Read, Self::ClaimInventory]),
            _ => BTreeSet::from([Self::Read]),
        }
    }
}

/// Result of the reachability handshake, scoped to one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionIdentity {
    pub organization_id: Uuid,
    pub organization_name: Option<String>,
    pub email: Option<String>,
    pub role: String,
    pub capabilities: BTreeSet<Capability>,
    pub verified_at: DateTime<Utc>,
}

impl SessionIdentity {
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Required capabilities this session lacks, in a stable order.
    pub fn missing(&self, required: &[Capability]) -> Vec<Capability> {
        let mut missing: Vec<_> = required
            .iter()
            .copied()
            .filter(|c| !self.has(*c))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_mapping() {
        assert_eq!(Capability::for_role("admin").len(), 3);
        assert_eq!(Capability::for_role("Write").len(), 3);
        assert_eq!(
            Capability::for_role("installer"),
            BTreeSet::from([Capability::Read, Capability::ClaimInventory])
        );
        assert_eq!(
            Capability::for_role("helpdesk"),
            BTreeSet::from([Capability::Read])
        );
    }

    #[test]
    fn missing_capabilities_are_sorted() {
        let session = SessionIdentity {
            organization_id: Uuid::nil(),
            organization_name: None,
            email: None,
            role: "read".into(),
            capabilities: Capability::for_role("read"),
            verified_at: Utc::now(),
        };
        assert_eq!(
            session.missing(&[Capability::ClaimInventory, Capability::ManageSites, Capability::Read]),
            vec![Capability::ManageSites, Capability::ClaimInventory]
        );
        assert_eq!(Capability::ManageSites.to_string(), "manage-sites");
    }
}
