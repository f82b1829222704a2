//! The central **abstraction** for sweeping operations.
//!
//! Probing and name resolution sit behind the [`Prober`] and [`NameResolver`]
//! traits so the [`SweepCoordinator`] never depends on a concrete technique.
//! [`prober_for`] and [`resolver_for`] pick the implementation a
//! [`SweepConfig`] asks for.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sweepr_common::config::{ProbeMethod, SweepConfig};
use sweepr_common::error::RangeError;
use sweepr_common::network::report::{ProbeResult, SweepReport};
use sweepr_common::network::target::{RangeSpec, Target};

use crate::network::icmp::IcmpProber;
use crate::network::tcp::TcpProber;

pub mod resolver;
pub mod sweep;

pub use resolver::{PtrResolver, SystemResolver};
pub use sweep::{SweepCoordinator, SweepProgress};

/// Decides whether a single target is alive.
///
/// Implementations must give up on their own once `timeout` has elapsed and
/// report failures through the returned [`ProbeResult`], never by panicking.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &Target, timeout: Duration) -> ProbeResult;
}

/// Looks up a human-readable name for an address.
///
/// `None` covers every failure: no record, a lookup error or running out of time.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve(&self, target: &Target, timeout: Duration) -> Option<String>;
}

/// Builds the prober selected by `config.method`.
pub fn prober_for(config: &SweepConfig) -> Arc<dyn Prober> {
    match config.method {
        ProbeMethod::Icmp => Arc::new(IcmpProber::new()),
        ProbeMethod::Tcp { port } => Arc::new(TcpProber::new(port)),
    }
}

/// Builds the resolver selected by `config.dns_server`.
pub fn resolver_for(config: &SweepConfig) -> Arc<dyn NameResolver> {
    match config.dns_server {
        Some(server) => Arc::new(PtrResolver::new(server)),
        None => Arc::new(SystemResolver),
    }
}

/// Executes a full sweep of `spec` with the probers and resolvers `config` selects.
pub async fn perform_sweep(
    spec: &RangeSpec,
    config: &SweepConfig,
    on_progress: Option<Box<dyn Fn(SweepProgress) + Send + Sync>>,
) -> Result<SweepReport, RangeError> {
    let mut coordinator = SweepCoordinator::new(prober_for(config), config.clone());
    if config.resolve_names {
        coordinator = coordinator.with_resolver(resolver_for(config));
    }
    if let Some(callback) = on_progress {
        coordinator = coordinator.with_progress(callback);
    }
    coordinator.sweep(spec).await
}
