//! # Result Sinks
//!
//! Where finished [`SweepReport`]s go.
//!
//! The [`InventorySink`] implements the host-inventory use cases: refreshing
//! the status of addresses already on record, and additionally recording
//! responders nobody knew about when discovering. The [`JsonReportSink`]
//! writes the raw report to disk.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sweepr_common::network::report::{ProbeErrorKind, ProbeResult, SweepReport};
use tracing::{debug, trace};

/// Receives the report of a finished sweep.
pub trait ResultSink {
    fn submit(&mut self, report: SweepReport) -> anyhow::Result<()>;
}

/// Labels attached to inventory records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tag {
    Online,
    Offline,
    AutoDiscovered,
}

impl Tag {
    pub fn slug(&self) -> &'static str {
        match self {
            Tag::Online => "online",
            Tag::Offline => "offline",
            Tag::AutoDiscovered => "auto-discovered",
        }
    }

    /// RGB colour the tag is rendered with.
    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Tag::Online => (0x4c, 0xaf, 0x50),
            Tag::Offline => (0xf4, 0x43, 0x36),
            Tag::AutoDiscovered => (0x21, 0x96, 0xf3),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryRecord {
    pub address: IpAddr,
    pub up_down: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,
    pub tags: BTreeSet<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_discovered: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
}

impl InventoryRecord {
    /// A record the inventory already holds but has not checked yet.
    pub fn known(address: IpAddr) -> Self {
        Self {
            address,
            up_down: false,
            dns_name: None,
            tags: BTreeSet::new(),
            auto_discovered: None,
            last_checked: None,
        }
    }

    fn discovered(address: IpAddr, on: NaiveDate) -> Self {
        let mut record = Self::known(address);
        record.tags.insert(Tag::AutoDiscovered);
        record.auto_discovered = Some(on);
        record
    }

    /// Folds one probe verdict into the record. The online/offline tags are
    /// only touched when `update_tags` is set.
    fn apply(&mut self, result: &ProbeResult, update_tags: bool) {
        self.up_down = result.is_reachable();
        if let Some(name) = result.name() {
            self.dns_name = Some(name.to_string());
        }
        self.last_checked = Some(result.timestamp());
        if !update_tags {
            return;
        }

        let (status, stale) = if self.up_down {
            (Tag::Online, Tag::Offline)
        } else {
            (Tag::Offline, Tag::Online)
        };
        self.tags.remove(&stale);
        self.tags.insert(status);
    }
}

/// Whether unknown responders become new records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    /// Update addresses already on record, ignore everything else.
    Refresh,
    /// Like `Refresh`, and also record reachable addresses not yet known.
    Discover,
}

/// An in-memory inventory keyed by address.
#[derive(Debug, Clone)]
pub struct InventorySink {
    mode: SinkMode,
    update_tags: bool,
    records: BTreeMap<IpAddr, InventoryRecord>,
}

impl InventorySink {
    pub fn new(mode: SinkMode) -> Self {
        Self {
            mode,
            update_tags: true,
            records: BTreeMap::new(),
        }
    }

    /// Whether sweeps rewrite the online/offline tags. On by default.
    pub fn with_tag_updates(mut self, update_tags: bool) -> Self {
        self.update_tags = update_tags;
        self
    }

    /// Seeds the inventory with addresses that are already on record.
    pub fn with_known(mut self, addresses: impl IntoIterator<Item = IpAddr>) -> Self {
        for address in addresses {
            self.records
                .entry(address)
                .or_insert_with(|| InventoryRecord::known(address));
        }
        self
    }

    pub fn record(&self, address: &IpAddr) -> Option<&InventoryRecord> {
        self.records.get(address)
    }

    pub fn records(&self) -> impl Iterator<Item = &InventoryRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ResultSink for InventorySink {
    fn submit(&mut self, report: SweepReport) -> anyhow::Result<()> {
        let discovered_on: NaiveDate = report.finished_at().date_naive();
        let mut updated: usize = 0;
        let mut created: usize = 0;

        for result in report.into_results() {
            // The deadline cut this target off before it was checked.
            if result.error() == Some(ProbeErrorKind::DeadlineExceeded) {
                continue;
            }

            let address: IpAddr = result.addr();
            match self.records.get_mut(&address) {
                Some(record) => {
                    record.apply(&result, self.update_tags);
                    updated += 1;
                }
                None if self.mode == SinkMode::Discover && result.is_reachable() => {
                    let mut record = InventoryRecord::discovered(address, discovered_on);
                    record.apply(&result, self.update_tags);
                    self.records.insert(address, record);
                    created += 1;
                }
                None => trace!("{address} is not on record, skipping"),
            }
        }

        debug!("Inventory updated {updated} records and created {created}");
        Ok(())
    }
}

/// Writes each submitted report as pretty-printed JSON, replacing the file.
#[derive(Debug, Clone)]
pub struct JsonReportSink {
    path: PathBuf,
}

impl JsonReportSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for JsonReportSink {
    fn submit(&mut self, report: SweepReport) -> anyhow::Result<()> {
        let file = File::create(&self.path)
            .with_context(|| format!("creating report file {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &report)
            .with_context(|| format!("writing report to {}", self.path.display()))?;
        writer
            .flush()
            .with_context(|| format!("flushing report to {}", self.path.display()))?;
        Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use sweepr_common::network::target::Target;

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn up(s: &str, name: Option<&str>) -> ProbeResult {
        ProbeResult::up(Target::new(addr(s)), Duration::from_millis(1)).with_name(name.map(String::from))
    }

    fn down(s: &str, kind: ProbeErrorKind) -> ProbeResult {
        ProbeResult::down(Target::new(addr(s)), kind)
    }

    fn report(results: Vec<ProbeResult>) -> SweepReport {
        let now = Utc::now();
        SweepReport::new("10.0.0.0/29", results, now, now, false)
    }

    #[test]
    fn refresh_only_touches_known_records() {
        let mut sink = InventorySink::new(SinkMode::Refresh).with_known([addr("10.0.0.1"), addr("10.0.0.2")]);

        sink.submit(report(vec![
            up("10.0.0.1", Some("gw.lan")),
            down("10.0.0.2", ProbeErrorKind::Timeout),
            up("10.0.0.3", None),
        ]))
        .unwrap();

        assert_eq!(sink.len(), 2);
        let gateway = sink.record(&addr("10.0.0.1")).unwrap();
        assert!(gateway.up_down);
        assert_eq!(gateway.dns_name.as_deref(), Some("gw.lan"));
        assert!(gateway.tags.contains(&Tag::Online));

        let quiet = sink.record(&addr("10.0.0.2")).unwrap();
        assert!(!quiet.up_down);
        assert!(quiet.tags.contains(&Tag::Offline));
        assert!(sink.record(&addr("10.0.0.3")).is_none());
    }

    #[test]
    fn discover_creates_tagged_records_for_responders() {
        let mut sink = InventorySink::new(SinkMode::Discover).with_known([addr("10.0.0.1")]);
        let report = report(vec![
            up("10.0.0.1", None),
            up("10.0.0.4", Some("nas.lan")),
            down("10.0.0.5", ProbeErrorKind::Unreachable),
        ]);
        let today = report.finished_at().date_naive();

        sink.submit(report).unwrap();

        assert_eq!(sink.len(), 2);
        let nas = sink.record(&addr("10.0.0.4")).unwrap();
        assert_eq!(nas.auto_discovered, Some(today));
        assert!(nas.tags.contains(&Tag::AutoDiscovered) && nas.tags.contains(&Tag::Online));
        assert_eq!(nas.dns_name.as_deref(), Some("nas.lan"));

        let known = sink.record(&addr("10.0.0.1")).unwrap();
        assert!(!known.tags.contains(&Tag::AutoDiscovered));
        assert!(sink.record(&addr("10.0.0.5")).is_none());
    }

    #[test]
    fn upserts_are_idempotent_and_keep_names() {
        let mut sink = InventorySink::new(SinkMode::Discover);
        sink.submit(report(vec![up("10.0.0.4", Some("nas.lan"))])).unwrap();
        let first = sink.record(&addr("10.0.0.4")).unwrap().clone();

        sink.submit(report(vec![up("10.0.0.4", None)])).unwrap();
        let second = sink.record(&addr("10.0.0.4")).unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(second.dns_name.as_deref(), Some("nas.lan"));
        assert_eq!(second.tags, first.tags);
        assert_eq!(second.auto_discovered, first.auto_discovered);
    }

    #[test]
    fn status_tag_flips_with_reachability() {
        let mut sink = InventorySink::new(SinkMode::Refresh).with_known([addr("10.0.0.1")]);
        sink.submit(report(vec![up("10.0.0.1", None)])).unwrap();
        sink.submit(report(vec![down("10.0.0.1", ProbeErrorKind::Timeout)])).unwrap();

        let record = sink.record(&addr("10.0.0.1")).unwrap();
        assert!(!record.up_down);
        assert_eq!(record.tags.iter().copied().collect::<Vec<_>>(), [Tag::Offline]);
    }

    #[test]
    fn tag_updates_can_be_switched_off() {
        let mut sink = InventorySink::new(SinkMode::Discover)
            .with_known([addr("10.0.0.1")])
            .with_tag_updates(false);

        sink.submit(report(vec![up("10.0.0.1", Some("gw.lan")), up("10.0.0.4", None)]))
            .unwrap();

        let gateway = sink.record(&addr("10.0.0.1")).unwrap();
        assert!(gateway.up_down);
        assert_eq!(gateway.dns_name.as_deref(), Some("gw.lan"));
        assert!(gateway.last_checked.is_some());
        assert!(gateway.tags.is_empty());

        let found = sink.record(&addr("10.0.0.4")).unwrap();
        assert_eq!(found.tags.iter().copied().collect::<Vec<_>>(), [Tag::AutoDiscovered]);
    }

    #[test]
    fn tag_colors_are_distinct() {
        let colors: BTreeSet<(u8, u8, u8)> =
            [Tag::Online, Tag::Offline, Tag::AutoDiscovered].iter().map(Tag::color).collect();
        assert_eq!(colors.len(), 3);
        assert_eq!(Tag::Online.color(), (76, 175, 80));
    }

    #[test]
    fn deadline_cut_targets_are_left_alone() {
        let mut sink = InventorySink::new(SinkMode::Refresh).with_known([addr("10.0.0.1")]);
        sink.submit(report(vec![up("10.0.0.1", None)])).unwrap();
        sink.submit(report(vec![down("10.0.0.1", ProbeErrorKind::DeadlineExceeded)])).unwrap();

        assert!(sink.record(&addr("10.0.0.1")).unwrap().up_down);
    }

    #[test]
    fn json_sink_writes_report() {
        let path = std::env::temp_dir().join(format!("sweepr-report-{}.json", std::process::id()));
        let mut sink = JsonReportSink::new(&path);

        sink.submit(report(vec![up("10.0.0.1", None)])).unwrap();

        let written: serde_json::Value = serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(written["spec"], "10.0.0.0/29");
        assert_eq!(written["reachable"], 1);
        std::fs::remove_file(path).unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn json_sink_surfaces_write_failures() {
        let mut sink = JsonReportSink::new("/dev/full");

        let outcome = sink.submit(report(vec![up("10.0.0.1", None)]));

        assert!(outcome.is_err());
    }
}
