use std::net::IpAddr;

use sweepr_common::config::{Config, SweepConfig};
use sweepr_common::network::report::SweepReport;
use sweepr_common::network::target::RangeSpec;
use sweepr_common::{success, warn};
use sweepr_core::discovery::{InventorySink, ResultSink, SinkMode};

use crate::commands::{Output, sweep};
use crate::terminal::{format, print};

/// Refreshes the status of one known address.
pub async fn ping(addr: IpAddr, sweep_cfg: &SweepConfig, cfg: &Config, output: &Output) -> anyhow::Result<()> {
    let spec: RangeSpec = RangeSpec::Host { addr };
    let report: SweepReport = sweep::execute(&spec, sweep_cfg, cfg).await?;
    sweep::write_json(output.json.as_deref(), &report)?;

    match report.results().first() {
        Some(result) if result.is_reachable() => {
            let latency: String = result.latency().map(format::format_latency).unwrap_or_default();
            match result.name() {
                Some(name) => success!("{addr} ({name}) is up, answered in {latency}"),
                None => success!("{addr} is up, answered in {latency}"),
            }
        }
        Some(result) => {
            let reason: String = result.error().map(|e| e.to_string()).unwrap_or_default();
            warn!("{addr} is down ({reason})");
        }
        None => warn!("{addr} produced no result"),
    }

    let mut inventory: InventorySink = output.inventory(SinkMode::Refresh).with_known([addr]);
    inventory.submit(report)?;

    if cfg.quiet == 0
        && let Some(record) = inventory.record(&addr)
    {
        print::header("Inventory Record", cfg.quiet);
        print::tree_head(0, record.dns_name.as_deref().unwrap_or("No hostname"));
        print::as_tree_one_level(format::record_to_details(record));
    }
    Ok(())
}
