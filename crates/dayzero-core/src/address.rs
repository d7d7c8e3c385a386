// ── Address arithmetic ──
//
// `AddressBlock` is an aligned IPv4 CIDR block. All derived blocks are
// new values computed with plain integer arithmetic on the base address;
// nothing here allocates state or depends on call order.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use crate::error::AddressError;

/// A contiguous IPv4 range `(base, prefix)` whose base has no host bits set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AddressBlock(Ipv4Net);

impl AddressBlock {
    /// Construct an aligned block. Fails if `prefix > 32` or if `base`
    /// has bits set below the prefix.
    pub fn new(base: Ipv4Addr, prefix: u8) -> Result<Self, AddressError> {
        let net =
            Ipv4Net::new(base, prefix).map_err(|_| AddressError::PrefixOutOfRange { prefix })?;
        if net.network() != base {
            return Err(AddressError::Misaligned {
                input: net.to_string(),
                aligned: net.trunc().to_string(),
            });
        }
        Ok(Self(net))
    }

    pub fn base(&self) -> Ipv4Addr {
        self.0.network()
    }

    pub fn prefix_len(&self) -> u8 {
        self.0.prefix_len()
    }

    /// Last address of the block (the broadcast address for prefixes < 31).
    pub fn last(&self) -> Ipv4Addr {
        self.0.broadcast()
    }

    /// Number of addresses in the block.
    pub fn size(&self) -> u64 {
        block_size(self.prefix_len())
    }

    /// Addresses usable by hosts: network and broadcast are reserved
    /// except on /31 point-to-point and /32 host routes.
    pub fn usable_hosts(&self) -> u64 {
        match self.prefix_len() {
            32 => 1,
            31 => 2,
            _ => self.size() - 2,
        }
    }

    /// First usable host address, conventionally the gateway.
    pub fn gateway(&self) -> Ipv4Addr {
        if self.prefix_len() >= 31 {
            self.base()
        } else {
            Ipv4Addr::from(u32::from(self.base()) + 1)
        }
    }

    /// `true` if `other` lies entirely inside `self`.
    pub fn contains(&self, other: &AddressBlock) -> bool {
        self.start() <= other.start() && other.end() <= self.end()
    }

    /// `true` if the two blocks share at least one address.
    pub fn overlaps(&self, other: &AddressBlock) -> bool {
        self.start() < other.end() && other.start() < self.end()
    }

    /// How many `/child_prefix` blocks partition this block, or `None` if
    /// `child_prefix` is shallower than this block or beyond /32.
    pub fn child_count(&self, child_prefix: u8) -> Option<u64> {
        if child_prefix > 32 || child_prefix < self.prefix_len() {
            return None;
        }
        Some(1u64 << (child_prefix - self.prefix_len()))
    }

    /// The `index`-th `/child_prefix` subdivision in address order:
    /// `base + index * 2^(32 - child_prefix)`.
    pub fn nth_child(&self, child_prefix: u8, index: u64) -> Option<AddressBlock> {
        let count = self.child_count(child_prefix)?;
        if index >= count {
            return None;
        }
        self.block_at(index * block_size(child_prefix), child_prefix)
    }

    /// The `/prefix` block starting `offset` addresses into this one, if it
    /// is aligned and fits.
    pub(crate) fn block_at(&self, offset: u64, prefix: u8) -> Option<AddressBlock> {
        if prefix > 32 || prefix < self.prefix_len() {
            return None;
        }
        if offset % block_size(prefix) != 0 || offset + block_size(prefix) > self.size() {
            return None;
        }
        let base = u32::try_from(self.start() + offset).ok()?;
        Self::new(Ipv4Addr::from(base), prefix).ok()
    }

    /// Offset of the first address past the end of `self`, relative to
    /// `parent`'s base.
    pub(crate) fn end_offset_in(&self, parent: &AddressBlock) -> u64 {
        self.end().saturating_sub(parent.start())
    }

    fn start(&self) -> u64 {
        u64::from(u32::from(self.base()))
    }

    /// One past the last address.
    fn end(&self) -> u64 {
        self.start() + self.size()
    }
}

/// Number of addresses in a `/prefix` block (`prefix <= 32`).
pub(crate) fn block_size(prefix: u8) -> u64 {
    1u64 << (32 - u32::from(prefix.min(32)))
}

impl fmt::Display for AddressBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AddressBlock {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let net: Ipv4Net = s.trim().parse().map_err(|e| AddressError::Parse {
            input: s.to_owned(),
            reason: format!("{e}"),
        })?;
        Self::new(net.addr(), net.prefix_len())
    }
}

impl TryFrom<String> for AddressBlock {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AddressBlock> for String {
    fn from(block: AddressBlock) -> Self {
        block.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn block(s: &str) -> AddressBlock {
        s.parse().unwrap()
    }

    #[test]
    fn parses_aligned_block() {
        let b = block("10.0.0.0/8");
        assert_eq!(b.base(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(b.prefix_len(), 8);
        assert_eq!(b.size(), 1 << 24);
        assert_eq!(b.last(), Ipv4Addr::new(10, 255, 255, 255));
    }

    #[test]
    fn rejects_host_bits() {
        let err = "10.1.2.3/16".parse::<AddressBlock>().unwrap_err();
        assert_eq!(
            err,
            AddressError::Misaligned {
                input: "10.1.2.3/16".into(),
                aligned: "10.1.0.0/16".into(),
            }
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            "10.0.0.0".parse::<AddressBlock>(),
            Err(AddressError::Parse { .. })
        ));
        assert!(matches!(
            "10.0.0.0/33".parse::<AddressBlock>(),
            Err(AddressError::Parse { .. })
        ));
        assert!(matches!(
            AddressBlock::new(Ipv4Addr::UNSPECIFIED, 40),
            Err(AddressError::PrefixOutOfRange { prefix: 40 })
        ));
    }

    #[test]
    fn nth_child_is_base_plus_index_times_size() {
        let b = block("10.0.0.0/8");
        assert_eq!(b.nth_child(11, 0), Some(block("10.0.0.0/11")));
        assert_eq!(b.nth_child(11, 1), Some(block("10.32.0.0/11")));
        assert_eq!(b.nth_child(11, 7), Some(block("10.224.0.0/11")));
        assert_eq!(b.nth_child(11, 8), None);
        assert_eq!(b.nth_child(7, 0), None);
    }

    #[test]
    fn whole_address_space_subdivides() {
        let all = block("0.0.0.0/0");
        assert_eq!(all.child_count(1), Some(2));
        assert_eq!(all.nth_child(1, 1), Some(block("128.0.0.0/1")));
        assert_eq!(all.child_count(32), Some(1 << 32));
        assert_eq!(
            all.nth_child(32, (1 << 32) - 1),
            Some(block("255.255.255.255/32"))
        );
    }

    #[test]
    fn containment_and_overlap() {
        let parent = block("10.32.0.0/11");
        let child = block("10.33.0.0/16");
        let sibling = block("10.64.0.0/11");
        assert!(parent.contains(&child));
        assert!(!parent.contains(&sibling));
        assert!(parent.overlaps(&child));
        assert!(!parent.overlaps(&sibling));
        assert!(child.overlaps(&parent));
    }

    #[test]
    fn usable_hosts_and_gateway() {
        let b = block("10.0.4.0/26");
        assert_eq!(b.usable_hosts(), 62);
        assert_eq!(b.gateway(), Ipv4Addr::new(10, 0, 4, 1));
        assert_eq!(block("10.0.0.8/31").usable_hosts(), 2);
        assert_eq!(block("10.0.0.8/31").gateway(), Ipv4Addr::new(10, 0, 0, 8));
    }

    #[test]
    fn serde_uses_cidr_string() {
        let b = block("172.16.0.0/12");
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "\"172.16.0.0/12\"");
        let back: AddressBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
        assert!(serde_json::from_str::<AddressBlock>("\"172.16.0.1/12\"").is_err());
    }
}
