use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use sweepr_common::config::{ProbeMethod, SweepConfig};
use sweepr_common::error::RangeError;
use sweepr_common::network::report::ProbeErrorKind;
use sweepr_common::network::target::RangeSpec;
use sweepr_core::scanner::{self, SweepCoordinator};
use tokio::net::TcpListener;
use tokio::time::Instant;

use crate::support::{FakeDns, FakeNetwork};

fn spec(s: &str) -> RangeSpec {
    s.parse().unwrap()
}

/// Sweeps the loopback address with the TCP prober through the public entry point.
#[tokio::test]
async fn sweep_single_loopback_over_tcp() {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let config = SweepConfig {
        method: ProbeMethod::Tcp {
            port: listener.local_addr().unwrap().port(),
        },
        ..SweepConfig::default()
    };

    let report = scanner::perform_sweep(&spec("127.0.0.1"), &config, None).await.unwrap();

    assert_eq!(report.requested(), 1);
    assert_eq!(report.reachable(), 1);
    let localhost: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
    assert_eq!(report.results()[0].addr(), localhost);
    assert!(report.results()[0].latency().is_some());
}

#[tokio::test]
async fn oversized_range_is_refused_before_probing() {
    let config = SweepConfig {
        method: ProbeMethod::Tcp { port: 9 },
        max_targets: 1_024,
        ..SweepConfig::default()
    };

    let err = scanner::perform_sweep(&spec("10.0.0.0/8"), &config, None).await.unwrap_err();
    assert_eq!(
        err,
        RangeError::RangeTooLarge {
            requested: 16_777_214,
            cap: 1_024
        }
    );
}

#[tokio::test(start_paused = true)]
async fn overlapping_list_is_probed_once_per_address() {
    let network = Arc::new(FakeNetwork::new(&["10.0.0.2", "10.0.0.6"], Duration::from_millis(5)));
    let coordinator = SweepCoordinator::new(network.clone(), SweepConfig::default());

    let report = coordinator
        .sweep(&spec("10.0.0.1-10.0.0.5, 10.0.0.4/30, 10.0.0.2"))
        .await
        .unwrap();

    let addrs: Vec<String> = report.results().iter().map(|r| r.addr().to_string()).collect();
    assert_eq!(addrs, ["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5", "10.0.0.6"]);
    assert_eq!(network.probes.load(Ordering::SeqCst), 6);
    assert_eq!(report.reachable(), 2);
    assert!(report.results().iter().all(|r| r.is_reachable() == r.latency().is_some()));
}

#[tokio::test(start_paused = true)]
async fn repeated_sweeps_agree_on_reachability() {
    let network = Arc::new(FakeNetwork::new(&["192.168.1.1", "192.168.1.7"], Duration::from_millis(3)));
    let coordinator = SweepCoordinator::new(network, SweepConfig::default());

    let first = coordinator.sweep(&spec("192.168.1.0/28")).await.unwrap();
    let second = coordinator.sweep(&spec("192.168.1.0/28")).await.unwrap();

    let flags = |report: &sweepr_common::network::report::SweepReport| -> Vec<(IpAddr, bool)> {
        report.results().iter().map(|r| (r.addr(), r.is_reachable())).collect()
    };
    assert_eq!(flags(&first), flags(&second));
    assert_eq!(first.reachable(), 2);
}

#[tokio::test(start_paused = true)]
async fn single_slot_serialises_probes() {
    let network = Arc::new(FakeNetwork::new(&[], Duration::from_millis(10)));
    let config = SweepConfig {
        concurrency: 1,
        ..SweepConfig::default()
    };
    let coordinator = SweepCoordinator::new(network.clone(), config);

    let started = Instant::now();
    coordinator.sweep(&spec("10.1.0.1-10.1.0.8")).await.unwrap();

    assert_eq!(network.max_in_flight.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() >= Duration::from_millis(80));
}

#[tokio::test(start_paused = true)]
async fn deadline_cuts_a_slow_sweep_short() {
    let network = Arc::new(FakeNetwork::new(&["10.0.0.1"], Duration::from_millis(200)));
    let config = SweepConfig {
        concurrency: 10,
        overall_deadline: Some(Duration::from_millis(50)),
        ..SweepConfig::default()
    };
    let coordinator = SweepCoordinator::new(network, config);

    let started = Instant::now();
    let report = coordinator.sweep(&spec("10.0.0.1-10.0.0.10")).await.unwrap();
    let elapsed = started.elapsed();

    assert!(report.deadline_exceeded());
    assert_eq!(report.requested(), 10);
    assert!(
        report
            .results()
            .iter()
            .all(|r| r.error() == Some(ProbeErrorKind::DeadlineExceeded))
    );
    assert!(elapsed >= Duration::from_millis(50) && elapsed < Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn names_follow_reachability() {
    let network = Arc::new(FakeNetwork::new(&["fd00::2"], Duration::from_millis(1)));
    let config = SweepConfig {
        resolve_names: true,
        ..SweepConfig::default()
    };
    let coordinator = SweepCoordinator::new(network, config).with_resolver(Arc::new(FakeDns));

    let report = coordinator.sweep(&spec("fd00::/126")).await.unwrap();

    assert_eq!(report.requested(), 2);
    assert_eq!(report.results()[0].name(), None);
    assert_eq!(report.results()[1].name(), Some("host-2.lan"));
}
