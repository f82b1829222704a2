//! # Sweep Coordinator
//!
//! Expands a [`RangeSpec`], probes every target with bounded parallelism and
//! gathers the verdicts into one [`SweepReport`].
//!
//! Probe slots are granted in ascending address order, so no target waits
//! behind one that sorts after it. Results land in a shared ledger keyed by
//! address; the report is assembled from that ledger once every job is done or
//! the overall deadline has expired, whichever comes first.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use sweepr_common::config::SweepConfig;
use sweepr_common::error::RangeError;
use sweepr_common::network::report::{ProbeErrorKind, ProbeResult, SweepReport};
use sweepr_common::network::target::{RangeSpec, Target};
use sweepr_common::warn;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::{sleep, timeout};
use tracing::{debug, trace};

use crate::scanner::{NameResolver, Prober};

type ProgressCallback = Arc<dyn Fn(SweepProgress) + Send + Sync>;

/// Snapshot handed to the progress callback after every finished target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepProgress {
    pub completed: usize,
    pub reachable: usize,
    pub total: usize,
}

pub struct SweepCoordinator {
    prober: Arc<dyn Prober>,
    resolver: Option<Arc<dyn NameResolver>>,
    config: SweepConfig,
    on_progress: Option<ProgressCallback>,
}

impl SweepCoordinator {
    pub fn new(prober: Arc<dyn Prober>, config: SweepConfig) -> Self {
        Self {
            prober,
            resolver: None,
            config,
            on_progress: None,
        }
    }

    /// Resolver consulted for reachable targets when `resolve_names` is set.
    pub fn with_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_progress(mut self, callback: impl Fn(SweepProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Sweeps `spec` and returns one result per expanded target, ordered by address.
    ///
    /// An invalid or oversized `spec` fails before a single probe is sent.
    pub async fn sweep(&self, spec: &RangeSpec) -> Result<SweepReport, RangeError> {
        let targets: Vec<Target> = spec.expand(self.config.max_targets)?;
        let started_at = Utc::now();

        debug!(
            "Sweeping {} targets of {spec} with {} probe slots",
            targets.len(),
            self.config.effective_concurrency()
        );
        if self.config.resolve_names && self.resolver.is_none() {
            warn!("Name resolution requested but no resolver configured, names will be empty");
        }

        let ledger: Arc<Mutex<Ledger>> = Arc::new(Mutex::new(Ledger::default()));
        let progress: Arc<Progress> = Arc::new(Progress::new(targets.len(), self.on_progress.clone()));
        let mut tasks: JoinSet<()> = JoinSet::new();
        let mut in_flight: HashMap<Id, Target> = HashMap::new();

        let dispatch = self.dispatch(&targets, &ledger, &progress, &mut tasks, &mut in_flight);
        let deadline_exceeded: bool = match self.config.overall_deadline {
            Some(limit) => timeout(limit, dispatch).await.is_err(),
            None => {
                dispatch.await;
                false
            }
        };

        // Aborts whatever is still probing or resolving. Tasks that panicked
        // before the abort still get their verdict.
        tasks.abort_all();
        while let Some(joined) = tasks.join_next_with_id().await {
            record_join_error(joined, &mut in_flight, &ledger, &progress).await;
        }

        let ledger: Ledger = std::mem::take(&mut *ledger.lock().await);
        if deadline_exceeded {
            warn!(
                "Overall deadline expired, {} of {} targets left without a verdict",
                targets.len() - ledger.results.len(),
                targets.len()
            );
        }

        let results: Vec<ProbeResult> = ledger.finalize(targets, deadline_exceeded);
        Ok(SweepReport::new(
            spec.to_string(),
            results,
            started_at,
            Utc::now(),
            deadline_exceeded,
        ))
    }

    async fn dispatch(
        &self,
        targets: &[Target],
        ledger: &Arc<Mutex<Ledger>>,
        progress: &Arc<Progress>,
        tasks: &mut JoinSet<()>,
        in_flight: &mut HashMap<Id, Target>,
    ) {
        let probe_slots = Arc::new(Semaphore::new(self.config.effective_concurrency()));
        let resolve_slots = Arc::new(Semaphore::new(self.config.effective_concurrency()));
        let resolver: Option<Arc<dyn NameResolver>> =
            self.resolver.clone().filter(|_| self.config.resolve_names);

        for target in targets {
            let Ok(permit) = Arc::clone(&probe_slots).acquire_owned().await else {
                break;
            };

            let job = ProbeJob {
                target: target.clone(),
                prober: Arc::clone(&self.prober),
                resolver: resolver.clone(),
                resolve_slots: Arc::clone(&resolve_slots),
                ledger: Arc::clone(ledger),
                progress: Arc::clone(progress),
                probe_timeout: self.config.probe_timeout,
                retry_count: self.config.retry_count,
                retry_backoff: self.config.retry_backoff,
                resolve_timeout: self.config.resolve_timeout,
            };
            let handle = tasks.spawn(job.run(permit));
            in_flight.insert(handle.id(), target.clone());

            while let Some(joined) = tasks.try_join_next_with_id() {
                record_join_error(joined, in_flight, ledger, progress).await;
            }
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            record_join_error(joined, in_flight, ledger, progress).await;
        }
    }
}

/// Forgets a finished task and, if it panicked, records its target as a send
/// error unless a verdict was already stored.
async fn record_join_error(
    joined: Result<(Id, ()), JoinError>,
    in_flight: &mut HashMap<Id, Target>,
    ledger: &Mutex<Ledger>,
    progress: &Progress,
) {
    let (id, panicked) = match joined {
        Ok((id, ())) => (id, false),
        Err(e) => (e.id(), e.is_panic()),
    };
    let Some(target) = in_flight.remove(&id) else {
        return;
    };
    if !panicked {
        return;
    }

    warn!("The probe task for {target} panicked, reporting it as a send error");
    let mut ledger = ledger.lock().await;
    if !ledger.results.contains_key(&target.addr()) {
        ledger
            .results
            .insert(target.addr(), ProbeResult::down(target, ProbeErrorKind::SendError));
        drop(ledger);
        progress.record(false);
    }
}

/// Verdicts and names collected so far.
#[derive(Default)]
struct Ledger {
    results: BTreeMap<IpAddr, ProbeResult>,
    names: HashMap<IpAddr, String>,
}

impl Ledger {
    /// One result per target. Targets without a recorded verdict were cut off
    /// by the deadline.
    fn finalize(mut self, targets: Vec<Target>, deadline_exceeded: bool) -> Vec<ProbeResult> {
        targets
            .into_iter()
            .map(|target| {
                let addr: IpAddr = target.addr();
                match self.results.remove(&addr) {
                    Some(result) => result.with_name(self.names.remove(&addr)),
                    None if deadline_exceeded => ProbeResult::down(target, ProbeErrorKind::DeadlineExceeded),
                    None => ProbeResult::down(target, ProbeErrorKind::SendError),
                }
            })
            .collect()
    }
}

struct Progress {
    completed: AtomicUsize,
    reachable: AtomicUsize,
    total: usize,
    callback: Option<ProgressCallback>,
}

impl Progress {
    fn new(total: usize, callback: Option<ProgressCallback>) -> Self {
        Self {
            completed: AtomicUsize::new(0),
            reachable: AtomicUsize::new(0),
            total,
            callback,
        }
    }

    fn record(&self, reachable: bool) {
        let completed: usize = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        let reachable: usize = if reachable {
            self.reachable.fetch_add(1, Ordering::Relaxed) + 1
        } else {
            self.reachable.load(Ordering::Relaxed)
        };

        if let Some(callback) = &self.callback {
            callback(SweepProgress {
                completed,
                reachable,
                total: self.total,
            });
        }
    }
}

struct ProbeJob {
    target: Target,
    prober: Arc<dyn Prober>,
    resolver: Option<Arc<dyn NameResolver>>,
    resolve_slots: Arc<Semaphore>,
    ledger: Arc<Mutex<Ledger>>,
    progress: Arc<Progress>,
    probe_timeout: Duration,
    retry_count: u32,
    retry_backoff: Duration,
    resolve_timeout: Duration,
}

impl ProbeJob {
    async fn run(self, permit: OwnedSemaphorePermit) {
        let result: ProbeResult = self.probe_with_retries().await;
        drop(permit);

        let addr: IpAddr = self.target.addr();
        let reachable: bool = result.is_reachable();
        self.ledger.lock().await.results.insert(addr, result);
        self.progress.record(reachable);

        if !reachable {
            return;
        }
        let Some(resolver) = &self.resolver else {
            return;
        };
        let Ok(_slot) = self.resolve_slots.acquire().await else {
            return;
        };

        let name: Option<String> = timeout(
            self.resolve_timeout,
            resolver.resolve(&self.target, self.resolve_timeout),
        )
        .await
        .unwrap_or_default();

        if let Some(name) = name {
            trace!("{addr} resolved to {name}");
            self.ledger.lock().await.names.insert(addr, name);
        }
    }

    /// Only timeouts are retried; an unreachable or unsendable target will not
    /// change its mind.
    async fn probe_with_retries(&self) -> ProbeResult {
        let mut attempt: u32 = 0;
        loop {
            let result: ProbeResult = timeout(self.probe_timeout, self.prober.probe(&self.target, self.probe_timeout))
                .await
                .unwrap_or_else(|_elapsed| ProbeResult::down(self.target.clone(), ProbeErrorKind::Timeout));

            if result.error() != Some(ProbeErrorKind::Timeout) || attempt >= self.retry_count {
                return result;
            }

            attempt += 1;
            trace!("Probe of {} timed out, retry {attempt} of {}", self.target, self.retry_count);
            if !self.retry_backoff.is_zero() {
                sleep(self.retry_backoff).await;
            }
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
