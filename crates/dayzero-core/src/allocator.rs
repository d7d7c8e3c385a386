// ── Topology allocation ──
//
// Partitions one supernet into zone blocks, zone blocks into site blocks,
// and site blocks into named functional subnets. Zone and site blocks are
// the i-th equal subdivision of their parent, so any (zone, site) slot maps
// to the same block no matter which other slots exist or in which order
// they are computed. That is what keeps sites collision-free without a
// shared allocation ledger.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::address::AddressBlock;
use crate::config::SiteRequest;
use crate::error::{AllocationLevel, AllocationOverflow, OverflowKind};

// ── Inputs ───────────────────────────────────────────────────────────

/// A named functional subnet and the number of hosts it must hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetSpec {
    pub name: String,
    pub hosts: u32,
}

impl SubnetSpec {
    pub fn new(name: impl Into<String>, hosts: u32) -> Self {
        Self {
            name: name.into(),
            hosts,
        }
    }

    /// Size of the smallest power-of-two block with `hosts` usable
    /// addresses (network and broadcast reserved), never below a /30.
    pub fn block_size(&self) -> u64 {
        (u64::from(self.hosts) + 2).next_power_of_two().max(4)
    }

    /// Prefix length of [`block_size`](Self::block_size), or `None` if no
    /// IPv4 block is large enough.
    pub fn block_prefix(&self) -> Option<u8> {
        let host_bits = self.block_size().trailing_zeros();
        u8::try_from(32u32.checked_sub(host_bits)?).ok()
    }
}

/// The fixed-width shape of the address plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyLayout {
    pub supernet: AddressBlock,
    pub zone_count: u32,
    pub zone_prefix: u8,
    pub sites_per_zone: u32,
    pub site_prefix: u8,
    /// Functional subnets carved from every site block, in placement order.
    pub subnets: Vec<SubnetSpec>,
}

// ── Outputs ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionalSubnet {
    pub name: String,
    pub block: AddressBlock,
    pub gateway: Ipv4Addr,
    pub usable_hosts: u64,
}

impl FunctionalSubnet {
    fn new(name: String, block: AddressBlock) -> Self {
        Self {
            name,
            gateway: block.gateway(),
            usable_hosts: block.usable_hosts(),
            block,
        }
    }
}

/// Everything a single site receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitePlan {
    pub zone: u32,
    pub site: u32,
    pub zone_block: AddressBlock,
    pub block: AddressBlock,
    pub subnets: Vec<FunctionalSubnet>,
}

impl SitePlan {
    pub fn subnet(&self, name: &str) -> Option<&FunctionalSubnet> {
        self.subnets.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZonePlan {
    pub index: u32,
    pub block: AddressBlock,
    pub sites: Vec<SitePlan>,
}

/// Supernet → zones → sites → functional subnets, ordered by address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub supernet: AddressBlock,
    pub zones: Vec<ZonePlan>,
}

impl AllocationPlan {
    pub fn site_plans(&self) -> impl Iterator<Item = &SitePlan> {
        self.zones.iter().flat_map(|z| z.sites.iter())
    }
}

/// Capacity overview of one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSummary {
    pub index: u32,
    pub block: AddressBlock,
    /// Site blocks that physically fit in the zone at the site prefix.
    pub site_capacity: u64,
    pub configured_sites: u32,
    pub requested_sites: usize,
}

// ── Level partitioning ───────────────────────────────────────────────

/// Split `supernet` into `zone_count` blocks of `/zone_prefix`, in address order.
pub fn allocate(
    supernet: AddressBlock,
    zone_count: u32,
    zone_prefix: u8,
) -> Result<Vec<AddressBlock>, AllocationOverflow> {
    partition(&AllocationLevel::Zone, supernet, zone_count, zone_prefix)
}

/// Split a zone block into `site_count` blocks of `/site_prefix`, in address order.
pub fn allocate_sites(
    zone: AddressBlock,
    site_count: u32,
    site_prefix: u8,
) -> Result<Vec<AddressBlock>, AllocationOverflow> {
    partition(&AllocationLevel::Site, zone, site_count, site_prefix)
}

/// Place functional subnets inside a site block, in the order given.
///
/// Placement is first-fit: each subnet takes the lowest aligned offset that
/// does not collide with an earlier one. A later subnet can fail even when
/// the total free space would suffice; that is policy, not a bug, and the
/// whole call fails rather than returning the subnets that did fit.
pub fn allocate_functional_subnets(
    site: AddressBlock,
    specs: &[SubnetSpec],
) -> Result<IndexMap<String, AddressBlock>, AllocationOverflow> {
    let mut packer = SubnetPacker::new(site);
    specs
        .iter()
        .map(|spec| packer.place(spec).map(|block| (spec.name.clone(), block)))
        .collect()
}

fn check_level(
    level: &AllocationLevel,
    parent: AddressBlock,
    count: u32,
    prefix: u8,
) -> Result<(), AllocationOverflow> {
    let overflow = |kind| AllocationOverflow {
        level: level.clone(),
        parent,
        kind,
    };

    // Sites must subdivide their zone; a single zone may span the supernet.
    let too_shallow = match level {
        AllocationLevel::Site => prefix <= parent.prefix_len(),
        _ => prefix < parent.prefix_len(),
    };
    if too_shallow {
        return Err(overflow(OverflowKind::PrefixNotDeeper {
            child_prefix: prefix,
        }));
    }
    let available = parent.child_count(prefix).unwrap_or(0);
    if u64::from(count) > available {
        return Err(overflow(OverflowKind::Exhausted {
            requested: u64::from(count),
            available,
        }));
    }
    Ok(())
}

fn partition(
    level: &AllocationLevel,
    parent: AddressBlock,
    count: u32,
    prefix: u8,
) -> Result<Vec<AddressBlock>, AllocationOverflow> {
    check_level(level, parent, count, prefix)?;
    (0..count)
        .map(|i| nth_block(level, parent, count, prefix, i))
        .collect()
}

/// The `index`-th child, O(1). Validates the level the same way
/// [`partition`] does so a single slot never succeeds where the full
/// partition would fail.
fn nth_block(
    level: &AllocationLevel,
    parent: AddressBlock,
    count: u32,
    prefix: u8,
    index: u32,
) -> Result<AddressBlock, AllocationOverflow> {
    check_level(level, parent, count, prefix)?;
    let exhausted = || AllocationOverflow {
        level: level.clone(),
        parent,
        kind: OverflowKind::Exhausted {
            requested: u64::from(index) + 1,
            available: u64::from(count),
        },
    };
    if index >= count {
        return Err(exhausted());
    }
    parent
        .nth_child(prefix, u64::from(index))
        .ok_or_else(exhausted)
}

// ── Functional subnet packing ────────────────────────────────────────

/// Incremental first-fit placement of functional subnets in one site block.
///
/// Blocks placed by earlier calls keep their ranges when a later call fails.
#[derive(Debug, Clone)]
pub struct SubnetPacker {
    site: AddressBlock,
    placed: Vec<AddressBlock>,
}

impl SubnetPacker {
    pub fn new(site: AddressBlock) -> Self {
        Self {
            site,
            placed: Vec::new(),
        }
    }

    pub fn place(&mut self, spec: &SubnetSpec) -> Result<AddressBlock, AllocationOverflow> {
        let size = spec.block_size();
        let prefix = match spec.block_prefix() {
            Some(p) if p >= self.site.prefix_len() => p,
            _ => return Err(self.no_room(spec, size)),
        };

        let mut offset = 0;
        loop {
            let Some(candidate) = self.site.block_at(offset, prefix) else {
                return Err(self.no_room(spec, size));
            };
            match self.placed.iter().find(|p| p.overlaps(&candidate)) {
                Some(taken) => offset = taken.end_offset_in(&self.site).div_ceil(size) * size,
                None => {
                    self.placed.push(candidate);
                    return Ok(candidate);
                }
            }
        }
    }

    /// Blocks placed so far, in placement order.
    pub fn placed(&self) -> &[AddressBlock] {
        &self.placed
    }

    /// Addresses of the site block not covered by any placed subnet.
    pub fn free(&self) -> u64 {
        let used: u64 = self.placed.iter().map(AddressBlock::size).sum();
        self.site.size() - used
    }

    fn no_room(&self, spec: &SubnetSpec, size: u64) -> AllocationOverflow {
        AllocationOverflow {
            level: AllocationLevel::FunctionalSubnet {
                name: spec.name.clone(),
            },
            parent: self.site,
            kind: OverflowKind::NoRoom {
                hosts: spec.hosts,
                block_size: size,
                free: self.free(),
            },
        }
    }
}

// ── Allocator ────────────────────────────────────────────────────────

/// Stateless address planner over a [`TopologyLayout`].
///
/// Shared freely across concurrent site workflows; every method is a pure
/// function of the layout and its arguments.
#[derive(Debug, Clone)]
pub struct TopologyAllocator {
    layout: TopologyLayout,
}

impl TopologyAllocator {
    pub fn new(layout: TopologyLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &TopologyLayout {
        &self.layout
    }

    /// All zone blocks.
    pub fn zones(&self) -> Result<Vec<AddressBlock>, AllocationOverflow> {
        allocate(
            self.layout.supernet,
            self.layout.zone_count,
            self.layout.zone_prefix,
        )
    }

    pub fn zone_block(&self, zone: u32) -> Result<AddressBlock, AllocationOverflow> {
        nth_block(
            &AllocationLevel::Zone,
            self.layout.supernet,
            self.layout.zone_count,
            self.layout.zone_prefix,
            zone,
        )
    }

    /// The plan of the site in slot `site` of zone `zone`, computed
    /// without touching any other slot.
    pub fn site_plan(&self, zone: u32, site: u32) -> Result<SitePlan, AllocationOverflow> {
        let zone_block = self.zone_block(zone)?;
        let block = nth_block(
            &AllocationLevel::Site,
            zone_block,
            self.layout.sites_per_zone,
            self.layout.site_prefix,
            site,
        )?;
        let subnets = allocate_functional_subnets(block, &self.layout.subnets)?
            .into_iter()
            .map(|(name, block)| FunctionalSubnet::new(name, block))
            .collect();

        Ok(SitePlan {
            zone,
            site,
            zone_block,
            block,
            subnets,
        })
    }

    /// The allocation tree covering the given `(zone, site)` slots.
    pub fn plan_for(
        &self,
        slots: impl IntoIterator<Item = (u32, u32)>,
    ) -> Result<AllocationPlan, AllocationOverflow> {
        let mut by_zone: BTreeMap<u32, BTreeMap<u32, SitePlan>> = BTreeMap::new();
        for (zone, site) in slots {
            let plan = self.site_plan(zone, site)?;
            by_zone.entry(zone).or_default().insert(site, plan);
        }

        let mut zones = Vec::with_capacity(by_zone.len());
        for (index, sites) in by_zone {
            zones.push(ZonePlan {
                index,
                block: self.zone_block(index)?,
                sites: sites.into_values().collect(),
            });
        }

        Ok(AllocationPlan {
            supernet: self.layout.supernet,
            zones,
        })
    }

    /// Per-zone capacity next to what the request list asks of it.
    pub fn zone_summaries(
        &self,
        requests: &[SiteRequest],
    ) -> Result<Vec<ZoneSummary>, AllocationOverflow> {
        let site_prefix = self.layout.site_prefix;
        Ok((0u32..)
            .zip(self.zones()?)
            .map(|(index, block)| ZoneSummary {
                index,
                block,
                site_capacity: if site_prefix > block.prefix_len() {
                    block.child_count(site_prefix).unwrap_or(0)
                } else {
                    0
                },
                configured_sites: self.layout.sites_per_zone,
                requested_sites: requests.iter().filter(|r| r.zone == index).count(),
            })
            .collect())
    }
}
