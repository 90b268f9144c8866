//! `asgsync reconcile`

use crate::Context;
use crate::cli::ReconcileArgs;
use crate::progress::BarProgress;
use crate::ui;
use anyhow::{Context as _, Result, bail};
use asgkit::{
    DesiredState, ExecuteOptions, LiveInventory, LoadOptions, Plan, Report, ReportMode,
    collect_inventory, execute, execute_simple, load_paths, reconcile,
};
use colored::Colorize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Instant;

pub fn run(ctx: &Context, args: ReconcileArgs) -> Result<()> {
    let inputs = resolve_inputs(&args.inputs, ctx.config.reconcile_inputs())?;

    // Confirmation reads from a terminal
    if args.apply && !args.yes && !std::io::stdin().is_terminal() {
        bail!("stdin is not a terminal: pass --yes to apply without confirmation");
    }

    let strict = args.strict || ctx.config.reconcile.strict;
    let start = Instant::now();
    let desired = load_paths(&inputs, LoadOptions { strict })
        .context("Failed to load declared security groups")?;
    log::debug!(
        "load ({:.2}s): {} declared",
        start.elapsed().as_secs_f64(),
        desired.len()
    );
    log::trace!("desired: {:?}", desired.names().collect::<Vec<_>>());

    let client = super::connect(ctx, &args.platform)?;
    let live = collect_inventory(&client).context("Failed to read security groups")?;
    let plan = reconcile(&desired, &live, &client).context("Failed to compute changes")?;
    log_candidates(&desired, &live, &plan);

    if !args.apply {
        let report = execute_simple(&plan, &client, ExecuteOptions { dry_run: true });
        return output(ctx, &report, args.json);
    }

    if plan.is_empty() {
        return output(ctx, &nothing_to_apply(&plan), args.json);
    }

    if !args.yes {
        if !args.json {
            ui::display_report(&Report::advisory(&plan));
        }
        if !confirm_proceed(plan.len())? {
            println!();
            println!("  {} Aborted", "✗".red());
            return Ok(());
        }
    }

    let mut progress = BarProgress::new(args.json || ctx.quiet);
    let report = execute(&plan, &client, ExecuteOptions::default(), &mut progress);
    output(ctx, &report, args.json)?;

    if !report.is_success() {
        bail!(
            "{} of {} action(s) failed",
            report.failures.len(),
            plan.len()
        );
    }
    Ok(())
}

/// Command-line inputs win over configured ones
fn resolve_inputs(given: &[PathBuf], configured: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    if !given.is_empty() {
        return Ok(given.to_vec());
    }
    if configured.is_empty() {
        bail!(
            "No inputs given. Pass YAML files or directories (\"-\" for stdin), \
             or set [reconcile] inputs in the config file"
        );
    }
    Ok(configured)
}

/// Apply-mode report when the platform is already in sync
fn nothing_to_apply(plan: &Plan) -> Report {
    let mut report = Report::new(ReportMode::Executing);
    report.protected = plan.protected().iter().cloned().collect();
    report
}

fn log_candidates(desired: &DesiredState, live: &LiveInventory, plan: &Plan) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let candidates: Vec<&str> = live
        .all_names
        .iter()
        .filter(|name| !desired.contains(name))
        .map(String::as_str)
        .collect();
    log::debug!("deletion candidates: {candidates:?}");
    log::debug!("protected: {:?}", plan.protected());
    log::debug!("plan: {:?}", plan.summary());
}

fn output(ctx: &Context, report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", report.to_json().context("Failed to serialize report")?);
    } else if !(ctx.quiet && report.is_empty()) {
        ui::display_report(report);
    }
    Ok(())
}

fn confirm_proceed(count: usize) -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt(format!("Apply {count} change(s)?"))
        .default(false)
        .interact()?;

    Ok(confirmed)
}
