//! # Probe Results
//!
//! The per-target verdict produced by a probe and the report that aggregates a
//! whole sweep. Both are immutable once built: constructors enforce that a
//! latency exists exactly when the target answered.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::network::target::Target;

/// Why a target was classified as not reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    /// No reply arrived within the probe timeout.
    Timeout,
    /// The network layer reported the destination as unreachable.
    Unreachable,
    /// The probe could not be sent at all.
    SendError,
    /// The sweep's overall deadline expired before a verdict was reached.
    DeadlineExceeded,
}

impl fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ProbeErrorKind::Timeout => "timeout",
            ProbeErrorKind::Unreachable => "unreachable",
            ProbeErrorKind::SendError => "send error",
            ProbeErrorKind::DeadlineExceeded => "deadline exceeded",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    target: Target,
    reachable: bool,
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    latency: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ProbeErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    timestamp: DateTime<Utc>,
}

impl ProbeResult {
    /// The target answered after `latency`.
    pub fn up(target: Target, latency: Duration) -> Self {
        Self {
            target,
            reachable: true,
            latency: Some(latency),
            error: None,
            name: None,
            timestamp: Utc::now(),
        }
    }

    /// The target did not answer.
    pub fn down(target: Target, error: ProbeErrorKind) -> Self {
        Self {
            target,
            reachable: false,
            latency: None,
            error: Some(error),
            name: None,
            timestamp: Utc::now(),
        }
    }

    /// Attaches a resolved name. Names are only kept for reachable targets.
    pub fn with_name(mut self, name: Option<String>) -> Self {
        if self.reachable {
            self.name = name;
        }
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn addr(&self) -> IpAddr {
        self.target.addr()
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }

    pub fn error(&self) -> Option<ProbeErrorKind> {
        self.error
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

fn serialize_millis<S: Serializer>(latency: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match latency {
        Some(latency) => serializer.serialize_some(&(latency.as_micros() as f64 / 1_000.0)),
        None => serializer.serialize_none(),
    }
}

/// Everything one sweep found, ordered by address.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    spec: String,
    requested: usize,
    reachable: usize,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    deadline_exceeded: bool,
    results: Vec<ProbeResult>,
}

impl SweepReport {
    /// Sorts `results` by address and derives the totals from them.
    pub fn new(
        spec: impl Into<String>,
        mut results: Vec<ProbeResult>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        deadline_exceeded: bool,
    ) -> Self {
        results.sort_by_key(ProbeResult::addr);
        let reachable = results.iter().filter(|r| r.is_reachable()).count();

        Self {
            spec: spec.into(),
            requested: results.len(),
            reachable,
            started_at,
            finished_at,
            deadline_exceeded,
            results,
        }
    }

    /// The range specification this sweep covered.
    pub fn spec(&self) -> &str {
        &self.spec
    }

    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<ProbeResult> {
        self.results
    }

    pub fn reachable_results(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results.iter().filter(|r| r.is_reachable())
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn reachable(&self) -> usize {
        self.reachable
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Whether the overall deadline cut the sweep short.
    pub fn deadline_exceeded(&self) -> bool {
        self.deadline_exceeded
    }

    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at).to_std().unwrap_or_default()
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
