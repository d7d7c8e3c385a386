//! `provision`: create every manifest site on the controller and claim
//! its devices.

use std::fmt::Write as _;
use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Tabled;

use dayzero_core::{
    CancellationToken, IdentityVerifier, InventoryBinder, ProvisioningOrchestrator, RunReport,
    SiteOutcome, SiteState,
};

use crate::cli::{GlobalOpts, ProvisionArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Site")]
    name: String,
    #[tabled(rename = "Zone")]
    zone: u32,
    #[tabled(rename = "Slot")]
    slot: u32,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Block")]
    block: String,
    #[tabled(rename = "Site ID")]
    remote_id: String,
    #[tabled(rename = "Devices")]
    devices: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn outcome_row(o: &SiteOutcome, color: bool) -> OutcomeRow {
    let site = &o.site;
    let bound = o.devices.iter().filter(|d| d.is_bound()).count();
    let detail = match site.state() {
        _ if o.fault.is_some() => o.fault.clone().unwrap_or_default(),
        SiteState::Failed { cause, .. } => cause.to_string(),
        _ if o.interrupted => "interrupted".into(),
        _ => String::new(),
    };
    OutcomeRow {
        name: site.name().to_owned(),
        zone: site.zone(),
        slot: site.index(),
        state: output::paint_state(site.state(), color),
        block: site
            .plan()
            .map_or_else(|| "-".into(), |plan| plan.block.to_string()),
        remote_id: site.remote_id().map(|id| id.to_string()).unwrap_or_default(),
        devices: format!("{bound}/{}", o.devices.len()),
        detail,
    }
}

fn report_table(report: &RunReport, color: bool) -> String {
    let rows: Vec<_> = report.sites.iter().map(|o| outcome_row(o, color)).collect();
    output::render_table(&rows)
}

fn report_plain(report: &RunReport) -> String {
    let mut out = String::new();
    for (i, o) in report.sites.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{}\t{}", o.site.name(), o.state().stage());
    }
    out
}

fn spinner(global: &GlobalOpts, sites: usize) -> ProgressBar {
    if global.quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Provisioning {sites} site(s)..."));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ProvisionArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let plan = util::load_plan(&args.manifest)?;
    let concurrency = args
        .concurrency
        .unwrap_or_else(|| config::load_config_or_default().defaults.concurrency);
    let (profile_name, controller) = config::controller_config(global)?;

    let total = plan.sites().len();
    if !util::confirm(
        &format!(
            "Provision {total} site(s) from {} on {}?",
            args.manifest.display(),
            controller.url
        ),
        "provision",
        global.yes,
    )? {
        return Ok(());
    }

    let client = dayzero_core::connect(&controller)?;
    let (layout, requests) = plan.into_parts();
    let orchestrator = ProvisioningOrchestrator::new(
        layout,
        IdentityVerifier::new(&client).with_organization(controller.org_id),
        &client,
        InventoryBinder::new(&client),
    )
    .with_concurrency(concurrency);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, waiting for in-flight calls");
            on_interrupt.cancel();
        }
    });

    let progress = spinner(global, total);
    let result = orchestrator
        .run(&controller.api_key, &requests, &cancel)
        .await;
    progress.finish_and_clear();
    let report = result.map_err(|e| CliError::from(e).for_profile(&profile_name))?;

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &report,
        |r| report_table(r, color),
        report_plain,
    )?;
    output::print_output(&out, global.quiet);

    if !global.quiet {
        eprintln!(
            "{} active, {} failed, {} interrupted",
            report.active_count(),
            report.failed_count(),
            report.interrupted_count()
        );
    }

    if report.all_active() {
        Ok(())
    } else {
        Err(CliError::Incomplete {
            incomplete: total - report.active_count(),
            total,
        })
    }
}
