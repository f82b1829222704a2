use std::fs::File;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use sweepr_common::config::SweepConfig;
use sweepr_common::network::target::RangeSpec;
use sweepr_core::discovery::{InventorySink, JsonReportSink, ResultSink, SinkMode, Tag};
use sweepr_core::scanner::SweepCoordinator;

use crate::support::{FakeDns, FakeNetwork};

fn addr(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn coordinator(alive: &[&str]) -> SweepCoordinator {
    let network = Arc::new(FakeNetwork::new(alive, Duration::from_millis(2)));
    let config = SweepConfig {
        resolve_names: true,
        ..SweepConfig::default()
    };
    SweepCoordinator::new(network, config).with_resolver(Arc::new(FakeDns))
}

/// The "Discover IPs" action: known hosts are refreshed, unknown responders recorded.
#[tokio::test(start_paused = true)]
async fn discovery_records_new_responders() {
    let range: RangeSpec = "192.168.10.0/29".parse().unwrap();
    let report = coordinator(&["192.168.10.1", "192.168.10.5"])
        .sweep(&range)
        .await
        .unwrap();
    let today = report.finished_at().date_naive();

    let mut inventory =
        InventorySink::new(SinkMode::Discover).with_known([addr("192.168.10.1"), addr("192.168.10.2")]);
    inventory.submit(report).unwrap();

    assert_eq!(inventory.len(), 3);

    let gateway = inventory.record(&addr("192.168.10.1")).unwrap();
    assert!(gateway.up_down && gateway.auto_discovered.is_none());
    assert_eq!(gateway.dns_name.as_deref(), Some("host-1.lan"));

    let silent = inventory.record(&addr("192.168.10.2")).unwrap();
    assert!(!silent.up_down && silent.tags.contains(&Tag::Offline));

    let found = inventory.record(&addr("192.168.10.5")).unwrap();
    assert_eq!(found.auto_discovered, Some(today));
    assert!(found.tags.contains(&Tag::AutoDiscovered));
}

/// The "Ping Subnet" action never grows the inventory.
#[tokio::test(start_paused = true)]
async fn subnet_refresh_keeps_inventory_closed() {
    let range: RangeSpec = "10.9.0.0/29".parse().unwrap();
    let report = coordinator(&["10.9.0.3", "10.9.0.4"]).sweep(&range).await.unwrap();

    let mut inventory = InventorySink::new(SinkMode::Refresh).with_known([addr("10.9.0.4")]);
    inventory.submit(report).unwrap();

    assert_eq!(inventory.len(), 1);
    assert!(inventory.record(&addr("10.9.0.4")).unwrap().up_down);
}

#[tokio::test(start_paused = true)]
async fn discovering_twice_changes_nothing() {
    let range: RangeSpec = "10.9.1.0/29".parse().unwrap();
    let sweeper = coordinator(&["10.9.1.2"]);
    let mut inventory = InventorySink::new(SinkMode::Discover);

    inventory.submit(sweeper.sweep(&range).await.unwrap()).unwrap();
    let first: Vec<_> = inventory
        .records()
        .map(|r| (r.address, r.up_down, r.dns_name.clone(), r.tags.clone()))
        .collect();

    inventory.submit(sweeper.sweep(&range).await.unwrap()).unwrap();
    let second: Vec<_> = inventory
        .records()
        .map(|r| (r.address, r.up_down, r.dns_name.clone(), r.tags.clone()))
        .collect();

    assert_eq!(first, second);
}

#[tokio::test(start_paused = true)]
async fn json_report_round_trips_through_disk() {
    let range: RangeSpec = "172.16.0.1-172.16.0.3".parse().unwrap();
    let report = coordinator(&["172.16.0.2"]).sweep(&range).await.unwrap();

    let path = std::env::temp_dir().join(format!("sweepr-it-{}.json", std::process::id()));
    JsonReportSink::new(&path).submit(report).unwrap();

    let json: serde_json::Value = serde_json::from_reader(File::open(&path).unwrap()).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(json["spec"], "172.16.0.1-172.16.0.3");
    assert_eq!(json["requested"], 3);
    assert_eq!(json["results"][1]["reachable"], true);
    assert_eq!(json["results"][1]["name"], "host-2.lan");
    assert_eq!(json["results"][0]["error"], "unreachable");
}
