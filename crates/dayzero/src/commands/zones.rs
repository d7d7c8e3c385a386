//! `zones`: zone blocks with their site capacity, offline.

use tabled::Tabled;

use dayzero_core::{TopologyAllocator, ZoneSummary};

use crate::cli::{GlobalOpts, ManifestArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "Zone")]
    index: u32,
    #[tabled(rename = "Block")]
    block: String,
    #[tabled(rename = "Capacity")]
    capacity: u64,
    #[tabled(rename = "Configured")]
    configured: u32,
    #[tabled(rename = "Requested")]
    requested: usize,
}

impl From<&ZoneSummary> for ZoneRow {
    fn from(z: &ZoneSummary) -> Self {
        Self {
            index: z.index,
            block: z.block.to_string(),
            capacity: z.site_capacity,
            configured: z.configured_sites,
            requested: z.requested_sites,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &ManifestArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let plan = util::load_plan(&args.manifest)?;
    let allocator = TopologyAllocator::new(plan.layout().clone());
    let summaries = allocator
        .zone_summaries(plan.sites())
        .map_err(dayzero_core::CoreError::from)?;

    let out = output::render_list(&global.output, &summaries, |z| ZoneRow::from(z), |z| {
        z.block.to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
