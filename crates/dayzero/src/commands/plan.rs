//! `plan`: render every site's address plan from a manifest, offline.

use std::fmt::Write as _;

use serde::Serialize;
use tabled::Tabled;

use dayzero_core::{AllocationOverflow, SitePlan, TopologyAllocator};

use crate::cli::{GlobalOpts, ManifestArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Planned site ────────────────────────────────────────────────────

#[derive(Serialize)]
struct PlannedSite {
    name: String,
    zone: u32,
    site: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<SitePlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    overflow: Option<AllocationOverflow>,
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Site")]
    name: String,
    #[tabled(rename = "Zone")]
    zone: u32,
    #[tabled(rename = "Slot")]
    slot: u32,
    #[tabled(rename = "Block")]
    block: String,
    #[tabled(rename = "Subnets")]
    subnets: String,
}

impl From<&PlannedSite> for PlanRow {
    fn from(p: &PlannedSite) -> Self {
        let (block, subnets) = match (&p.plan, &p.overflow) {
            (Some(plan), _) => {
                let mut lines = String::new();
                for (i, s) in plan.subnets.iter().enumerate() {
                    if i > 0 {
                        lines.push('\n');
                    }
                    let _ = write!(
                        lines,
                        "{:<10} {:<18} gw {:<15} {} hosts",
                        s.name,
                        s.block.to_string(),
                        s.gateway,
                        s.usable_hosts
                    );
                }
                (plan.block.to_string(), lines)
            }
            (None, Some(overflow)) => ("-".into(), overflow.to_string()),
            (None, None) => ("-".into(), String::new()),
        };
        Self {
            name: p.name.clone(),
            zone: p.zone,
            slot: p.site,
            block,
            subnets,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &ManifestArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let plan = util::load_plan(&args.manifest)?;
    let allocator = TopologyAllocator::new(plan.layout().clone());

    let planned: Vec<PlannedSite> = plan
        .sites()
        .iter()
        .map(|request| {
            let (plan, overflow) = match allocator.site_plan(request.zone, request.site) {
                Ok(plan) => (Some(plan), None),
                Err(overflow) => (None, Some(overflow)),
            };
            PlannedSite {
                name: request.name.clone(),
                zone: request.zone,
                site: request.site,
                plan,
                overflow,
            }
        })
        .collect();

    let out = output::render_list(&global.output, &planned, |p| PlanRow::from(p), |p| {
        let block = p
            .plan
            .as_ref()
            .map_or_else(|| "-".to_owned(), |plan| plan.block.to_string());
        format!("{}\t{block}", p.name)
    })?;
    output::print_output(&out, global.quiet);

    let unplannable = planned.iter().filter(|p| p.overflow.is_some()).count();
    if unplannable > 0 {
        return Err(CliError::Unplannable { count: unplannable });
    }
    Ok(())
}
