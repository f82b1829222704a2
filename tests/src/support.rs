use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sweepr_common::network::report::{ProbeErrorKind, ProbeResult};
use sweepr_common::network::target::Target;
use sweepr_core::scanner::{NameResolver, Prober};

/// A network where only `alive` answers, each after `delay`.
pub struct FakeNetwork {
    alive: HashSet<IpAddr>,
    delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub probes: AtomicUsize,
}

impl FakeNetwork {
    pub fn new(alive: &[&str], delay: Duration) -> Self {
        Self {
            alive: alive.iter().map(|s| s.parse().unwrap()).collect(),
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Prober for FakeNetwork {
    async fn probe(&self, target: &Target, _timeout: Duration) -> ProbeResult {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.alive.contains(&target.addr()) {
            ProbeResult::up(target.clone(), self.delay)
        } else {
            ProbeResult::down(target.clone(), ProbeErrorKind::Unreachable)
        }
    }
}

/// Names every address `host-<last segment>.lan`.
pub struct FakeDns;

#[async_trait]
impl NameResolver for FakeDns {
    async fn resolve(&self, target: &Target, _timeout: Duration) -> Option<String> {
        let addr = target.addr().to_string();
        let last = addr.rsplit(['.', ':']).next().unwrap_or_default().to_string();
        Some(format!("host-{last}.lan"))
    }
}
