use std::collections::BTreeSet;
use std::fs;
use std::net::IpAddr;
use std::path::Path;

use anyhow::Context;
use colored::*;
use sweepr_common::config::{Config, SweepConfig};
use sweepr_common::network::report::SweepReport;
use sweepr_common::network::target::RangeSpec;
use sweepr_common::{info, success};
use sweepr_core::discovery::{InventoryRecord, InventorySink, ResultSink, SinkMode};

use crate::commands::{Output, sweep};
use crate::{mprint, terminal::{colors, format, print}};

pub async fn discover(
    spec: RangeSpec,
    known: Option<&Path>,
    sweep_cfg: &SweepConfig,
    cfg: &Config,
    output: &Output,
) -> anyhow::Result<()> {
    let known_addrs: BTreeSet<IpAddr> = match known {
        Some(path) => load_known(path)?,
        None => BTreeSet::new(),
    };
    if !known_addrs.is_empty() {
        info!("{} addresses already on record", known_addrs.len());
    }

    let report: SweepReport = sweep::execute(&spec, sweep_cfg, cfg).await?;
    sweep::write_json(output.json.as_deref(), &report)?;

    let mut inventory: InventorySink = output
        .inventory(SinkMode::Discover)
        .with_known(known_addrs.iter().copied());
    inventory.submit(report.clone())?;

    discovery_ends(&inventory, &known_addrs, cfg);
    sweep::print_summary(&report, cfg);
    Ok(())
}

/// Reads one address per line. Blank lines and `#` comments are skipped.
pub fn load_known(path: &Path) -> anyhow::Result<BTreeSet<IpAddr>> {
    let content: String =
        fs::read_to_string(path).with_context(|| format!("reading known addresses from {}", path.display()))?;
    parse_known(&content).with_context(|| format!("parsing {}", path.display()))
}

fn parse_known(content: &str) -> anyhow::Result<BTreeSet<IpAddr>> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line_no, line)| {
            line.parse::<IpAddr>()
                .with_context(|| format!("line {line_no}: '{line}' is not an address"))
        })
        .collect()
}

fn discovery_ends(inventory: &InventorySink, known: &BTreeSet<IpAddr>, cfg: &Config) {
    let new_records: Vec<&InventoryRecord> = inventory
        .records()
        .filter(|record| !known.contains(&record.address))
        .collect();
    let online_known: usize = inventory
        .records()
        .filter(|record| known.contains(&record.address) && record.up_down)
        .count();

    if cfg.quiet < 2 && !new_records.is_empty() {
        print::header("Discovered Hosts", cfg.quiet);
        print_records(&new_records);
    }

    if !known.is_empty() {
        info!("{online_known} of {} known hosts are online", known.len());
    }

    let discovered: ColoredString = format!("{} new hosts", new_records.len()).bold().color(colors::DISCOVERED);
    success!("Discovery recorded {discovered}");
}

pub fn print_records(records: &[&InventoryRecord]) {
    for (idx, record) in records.iter().enumerate() {
        print::tree_head(idx, record.dns_name.as_deref().unwrap_or("No hostname"));
        print::as_tree_one_level(format::record_to_details(record));
        if idx + 1 != records.len() {
            mprint!();
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
