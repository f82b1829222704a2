use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Presentation settings for the terminal front end.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Hides the banner on startup.
    pub no_banner: bool,
    /// `0` prints everything, `1` only results and summary, `2` only the summary.
    pub quiet: u8,
}

/// How a target's liveness is tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeMethod {
    /// ICMP echo request. Needs raw or ping sockets.
    #[default]
    Icmp,
    /// TCP connect to one port. Works unprivileged.
    Tcp { port: u16 },
}

pub const DEFAULT_TCP_PORT: u16 = 443;

impl FromStr for ProbeMethod {
    type Err = String;

    /// Accepts `icmp`, `tcp` and `tcp:<port>` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.split_once(':') {
            None if lower == "icmp" => Ok(ProbeMethod::Icmp),
            None if lower == "tcp" => Ok(ProbeMethod::Tcp {
                port: DEFAULT_TCP_PORT,
            }),
            Some(("tcp", port)) => port
                .parse::<u16>()
                .map(|port| ProbeMethod::Tcp { port })
                .map_err(|e| format!("invalid tcp port '{port}': {e}")),
            _ => Err(format!("unknown probe method '{s}', expected icmp, tcp or tcp:<port>")),
        }
    }
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeMethod::Icmp => f.write_str("icmp"),
            ProbeMethod::Tcp { port } => write!(f, "tcp:{port}"),
        }
    }
}

/// Everything the sweep engine needs to know, passed in explicitly.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Maximum number of probes in flight at once. Zero behaves like one.
    pub concurrency: usize,
    /// Deadline for a single probe attempt.
    pub probe_timeout: Duration,
    /// Extra attempts for a target whose probe timed out.
    pub retry_count: u32,
    /// Pause before each retry.
    pub retry_backoff: Duration,
    /// Hard cap on the wall time of the whole sweep.
    pub overall_deadline: Option<Duration>,
    /// Reverse-resolve targets that answered.
    pub resolve_names: bool,
    pub resolve_timeout: Duration,
    /// Query this server directly for PTR records instead of the system resolver.
    pub dns_server: Option<SocketAddr>,
    pub method: ProbeMethod,
    /// Upper bound on the number of addresses a single sweep may expand to.
    pub max_targets: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            concurrency: 64,
            probe_timeout: Duration::from_millis(1_000),
            retry_count: 0,
            retry_backoff: Duration::ZERO,
            overall_deadline: None,
            resolve_names: false,
            resolve_timeout: Duration::from_millis(2_000),
            dns_server: None,
            method: ProbeMethod::default(),
            max_targets: 65_536,
        }
    }
}

impl SweepConfig {
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    /// Longest time one target can hold a probe slot.
    pub fn slot_budget(&self) -> Duration {
        let attempts = self.retry_count.saturating_add(1);
        self.probe_timeout.saturating_mul(attempts) + self.retry_backoff.saturating_mul(self.retry_count)
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
