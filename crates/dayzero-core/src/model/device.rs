// ── Hardware identity ──
//
// A device enters the workflow as a raw string from the manifest and is
// parsed exactly once into a `DeviceIdentity`. Claim codes and MAC
// addresses are normalized so the same unit always compares equal.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ClaimError;

const CLAIM_CODE_LEN: usize = 15;

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address, normalized to 12 lowercase hex digits (`5c5b35000001`).
///
/// `Display` renders the colon-separated form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MacAddress(String);

impl MacAddress {
    /// Parse colon-, dash-, dot-separated or bare hex. `None` if the input
    /// is not exactly six octets.
    pub fn parse(raw: &str) -> Option<Self> {
        let hex: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.'))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        (hex.len() == 12 && hex.chars().all(|c| c.is_ascii_hexdigit())).then_some(Self(hex))
    }

    /// The bare-hex form used on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pair) in self.0.as_bytes().chunks(2).enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            f.write_str(std::str::from_utf8(pair).map_err(|_| fmt::Error)?)?;
        }
        Ok(())
    }
}

// ── ClaimCode ───────────────────────────────────────────────────────

/// A 15-character alphanumeric claim code, uppercased with separators removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ClaimCode(String);

impl ClaimCode {
    pub fn parse(raw: &str) -> Result<Self, ClaimError> {
        let invalid = |reason: String| ClaimError::InvalidClaimCode {
            code: raw.to_owned(),
            reason,
        };

        let code: String = raw
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if let Some(bad) = code.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(invalid(format!("unexpected character '{bad}'")));
        }
        if code.len() != CLAIM_CODE_LEN {
            return Err(invalid(format!(
                "expected {CLAIM_CODE_LEN} characters, got {}",
                code.len()
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClaimCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── DeviceIdentity ──────────────────────────────────────────────────

/// How a device is identified to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DeviceIdentity {
    /// Not yet in the organization's inventory; claimed by code first.
    ClaimCode(ClaimCode),
    /// Already in the inventory; only assigned to the site.
    Mac(MacAddress),
}

impl DeviceIdentity {
    /// Anything that parses as a MAC address is treated as one; everything
    /// else must be a valid claim code.
    pub fn parse(raw: &str) -> Result<Self, ClaimError> {
        if raw.trim().is_empty() {
            return Err(ClaimError::InvalidClaimCode {
                code: raw.to_owned(),
                reason: "empty device identity".into(),
            });
        }
        match MacAddress::parse(raw) {
            Some(mac) => Ok(Self::Mac(mac)),
            None => ClaimCode::parse(raw).map(Self::ClaimCode),
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClaimCode(code) => write!(f, "{code}"),
            Self::Mac(mac) => write!(f, "{mac}"),
        }
    }
}

// ── ClaimedDevice ───────────────────────────────────────────────────

/// A device bound to a site. Only the binder constructs one, and no
/// method moves it to another site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimedDevice {
    identity: DeviceIdentity,
    mac: Option<MacAddress>,
    serial: Option<String>,
    model: Option<String>,
    site: String,
    site_id: Uuid,
    claimed_at: DateTime<Utc>,
}

impl ClaimedDevice {
    pub(crate) fn new(
        identity: DeviceIdentity,
        mac: Option<MacAddress>,
        serial: Option<String>,
        model: Option<String>,
        site: String,
        site_id: Uuid,
    ) -> Self {
        Self {
            identity,
            mac,
            serial,
            model,
            site,
            site_id,
            claimed_at: Utc::now(),
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn mac(&self) -> Option<&MacAddress> {
        self.mac.as_ref()
    }

    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn site_id(&self) -> Uuid {
        self.site_id
    }

    pub fn claimed_at(&self) -> DateTime<Utc> {
        self.claimed_at
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn mac_formats_normalize() {
        let a = MacAddress::parse("5C:5B:35:00:00:01").unwrap();
        let b = MacAddress::parse("5c-5b-35-00-00-01").unwrap();
        let c = MacAddress::parse("5c5b.3500.0001").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "5c5b35000001");
        assert_eq!(a.to_string(), "5c:5b:35:00:00:01");
    }

    #[test]
    fn mac_rejects_wrong_length() {
        assert!(MacAddress::parse("5c5b3500001").is_none());
        assert!(MacAddress::parse("5c5b35000001ff").is_none());
        assert!(MacAddress::parse("zz5b35000001").is_none());
    }

    #[test]
    fn claim_code_is_normalized() {
        let code = ClaimCode::parse("abcde-12345-fghij").unwrap();
        assert_eq!(code.as_str(), "ABCDE12345FGHIJ");
    }

    #[test]
    fn claim_code_rejects_malformed_input() {
        let err = ClaimCode::parse("ABC123").unwrap_err();
        assert!(matches!(err, ClaimError::InvalidClaimCode { ref reason, .. } if reason.contains("15")));

        let err = ClaimCode::parse("ABCDE12345FGHI!").unwrap_err();
        assert!(matches!(err, ClaimError::InvalidClaimCode { ref reason, .. } if reason.contains('!')));
    }

    #[test]
    fn identity_prefers_mac() {
        assert!(matches!(
            DeviceIdentity::parse("5c:5b:35:00:00:01").unwrap(),
            DeviceIdentity::Mac(_)
        ));
        assert!(matches!(
            DeviceIdentity::parse("ABCDE12345FGHIJ").unwrap(),
            DeviceIdentity::ClaimCode(_)
        ));
        assert!(DeviceIdentity::parse("   ").is_err());
    }
}
