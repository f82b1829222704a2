use std::collections::BTreeSet;
use std::net::IpAddr;
use std::path::Path;

use colored::*;
use sweepr_common::config::{Config, SweepConfig};
use sweepr_common::network::report::SweepReport;
use sweepr_common::network::target::RangeSpec;
use sweepr_common::{info, success, warn};
use sweepr_core::discovery::{InventoryRecord, InventorySink, JsonReportSink, ResultSink, SinkMode};
use sweepr_core::scanner::{self, SweepProgress};
use tracing::debug;

use crate::commands::{Output, discover};
use crate::{mprint, terminal::{colors, format, print, spinner}};

pub async fn sweep(
    spec: RangeSpec,
    known: Option<&Path>,
    sweep_cfg: &SweepConfig,
    cfg: &Config,
    output: &Output,
) -> anyhow::Result<()> {
    let known_addrs: Option<BTreeSet<IpAddr>> = known.map(discover::load_known).transpose()?;

    let report: SweepReport = execute(&spec, sweep_cfg, cfg).await?;
    write_json(output.json.as_deref(), &report)?;

    let Some(known_addrs) = known_addrs else {
        sweep_ends(&report, cfg);
        return Ok(());
    };

    let mut inventory: InventorySink = output.inventory(SinkMode::Refresh).with_known(known_addrs);
    inventory.submit(report.clone())?;
    refresh_ends(&inventory, cfg);
    print_summary(&report, cfg);
    Ok(())
}

fn refresh_ends(inventory: &InventorySink, cfg: &Config) {
    if cfg.quiet < 2 && !inventory.is_empty() {
        print::header("Refreshed Records", cfg.quiet);
        let records: Vec<&InventoryRecord> = inventory.records().collect();
        discover::print_records(&records);
    }

    let online: usize = inventory.records().filter(|record| record.up_down).count();
    info!("{online} of {} known hosts are online", inventory.len());
}

/// Runs the sweep behind the progress spinner.
pub async fn execute(spec: &RangeSpec, sweep_cfg: &SweepConfig, cfg: &Config) -> anyhow::Result<SweepReport> {
    print_plan(spec, sweep_cfg, cfg);

    let progress: Box<dyn Fn(SweepProgress) + Send + Sync> = Box::new(spinner::report_sweep_progress);
    let outcome = scanner::perform_sweep(spec, sweep_cfg, Some(progress)).await;
    spinner::get_spinner().finish_and_clear();

    let report: SweepReport = outcome?;
    for result in report.results().iter().filter(|r| !r.is_reachable()) {
        if let Some(error) = result.error() {
            debug!("{} is down: {error}", result.addr());
        }
    }
    if report.deadline_exceeded() {
        warn!("Deadline reached before every target was probed");
    }
    Ok(report)
}

pub fn write_json(path: Option<&Path>, report: &SweepReport) -> anyhow::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let mut sink = JsonReportSink::new(path);
    sink.submit(report.clone())?;
    success!("Report written to {}", sink.path().display());
    Ok(())
}

fn print_plan(spec: &RangeSpec, sweep_cfg: &SweepConfig, cfg: &Config) {
    if cfg.quiet > 0 {
        return;
    }

    print::set_key_width(["Range", "Method", "Parallel", "Timeout"]);
    print::aligned_line("Range", spec.to_string());
    print::aligned_line("Method", sweep_cfg.method.to_string());
    print::aligned_line("Parallel", sweep_cfg.effective_concurrency().to_string());
    print::aligned_line(
        "Timeout",
        format!("{}ms x {}", sweep_cfg.probe_timeout.as_millis(), sweep_cfg.retry_count + 1),
    );
}

fn sweep_ends(report: &SweepReport, cfg: &Config) {
    if report.reachable() == 0 {
        no_hosts_found(cfg);
        print_summary(report, cfg);
        return;
    }

    if cfg.quiet > 0 {
        mprint!();
    }

    print::header("Sweep Results", cfg.quiet);
    print_hosts(report, cfg);
    print_summary(report, cfg);
}

fn no_hosts_found(cfg: &Config) {
    print::header("ZERO HOSTS ANSWERED", cfg.quiet);
    if cfg.quiet == 0 {
        print::no_results();
    }
}

fn print_hosts(report: &SweepReport, cfg: &Config) {
    if cfg.quiet == 2 {
        return;
    }

    let reachable: usize = report.reachable();
    for (idx, result) in report.reachable_results().enumerate() {
        let name: &str = result.name().unwrap_or("No hostname");
        print::tree_head(idx, name);
        print::as_tree_one_level(format::result_to_details(result));
        if idx + 1 != reachable {
            mprint!();
        }
    }
}

pub fn print_summary(report: &SweepReport, cfg: &Config) {
    let active_hosts: ColoredString = format!("{} of {}", report.reachable(), report.requested())
        .bold()
        .green();
    let total_time: ColoredString = format!("{:.2}s", report.elapsed().as_secs_f64()).bold().yellow();
    let output: &ColoredString = &format!("Sweep Complete: {active_hosts} hosts answered in {total_time}")
        .color(colors::TEXT_DEFAULT);

    match cfg.quiet {
        0 => {
            print::fat_separator();
            print::centerln(output);
        }
        _ => {
            mprint!();
            success!("{}", output)
        }
    }
}
