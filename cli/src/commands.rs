pub mod discover;
pub mod ping;
pub mod sweep;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use sweepr_common::config::{ProbeMethod, SweepConfig};
use sweepr_common::network::target::RangeSpec;
use sweepr_core::discovery::{InventorySink, SinkMode};
use sweepr_protocols::dns::DNS_PORT;

#[derive(Parser)]
#[command(name = "sweepr", version)]
#[command(about = "A concurrent ping sweeper and host discoverer.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub sweep: SweepArgs,

    /// Also write the sweep report as JSON to this file
    #[arg(long, value_name = "FILE", global = true, env = "SWEEPR_JSON")]
    pub json: Option<PathBuf>,

    /// Print less; repeat to print only the summary
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Hide the startup banner
    #[arg(long, global = true, env = "SWEEPR_NO_BANNER")]
    pub no_banner: bool,

    /// Rewrite the online/offline tags of inventory records
    #[arg(long, value_name = "BOOL", global = true, env = "SWEEPR_UPDATE_TAGS", default_value_t = true, action = ArgAction::Set)]
    pub update_tags: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe a single address and report its status
    #[command(alias = "p")]
    Ping { addr: IpAddr },
    /// Probe every address of a range, refreshing the known ones if given
    #[command(alias = "s")]
    Sweep {
        range: RangeSpec,
        /// File with one already known address per line
        #[arg(long, value_name = "FILE")]
        known: Option<PathBuf>,
    },
    /// Sweep a range and record responders that are not yet known
    #[command(alias = "d")]
    Discover {
        range: RangeSpec,
        /// File with one already known address per line
        #[arg(long, value_name = "FILE")]
        known: Option<PathBuf>,
    },
}

/// Where a finished sweep is recorded besides the terminal.
pub struct Output {
    pub json: Option<PathBuf>,
    pub update_tags: bool,
}

impl Output {
    pub fn inventory(&self, mode: SinkMode) -> InventorySink {
        InventorySink::new(mode).with_tag_updates(self.update_tags)
    }
}

/// Flags that end up in the [`SweepConfig`].
#[derive(Args)]
pub struct SweepArgs {
    /// Maximum number of probes in flight
    #[arg(long, global = true, env = "SWEEPR_CONCURRENCY", default_value_t = 64)]
    pub concurrency: usize,

    /// Per-probe timeout in milliseconds
    #[arg(long = "timeout", value_name = "MS", global = true, env = "SWEEPR_TIMEOUT", default_value_t = 1_000)]
    pub timeout_ms: u64,

    /// Extra attempts for targets that timed out
    #[arg(long, global = true, env = "SWEEPR_RETRIES", default_value_t = 0)]
    pub retries: u32,

    /// Pause before each retry in milliseconds
    #[arg(long = "backoff", value_name = "MS", global = true, env = "SWEEPR_BACKOFF", default_value_t = 0)]
    pub backoff_ms: u64,

    /// Hard cap on the whole sweep in milliseconds
    #[arg(long = "deadline", value_name = "MS", global = true, env = "SWEEPR_DEADLINE")]
    pub deadline_ms: Option<u64>,

    /// Reverse-resolve hosts that answered
    #[arg(long, global = true, env = "SWEEPR_RESOLVE")]
    pub resolve: bool,

    /// Per-lookup timeout in milliseconds
    #[arg(long = "resolve-timeout", value_name = "MS", global = true, env = "SWEEPR_RESOLVE_TIMEOUT", default_value_t = 2_000)]
    pub resolve_timeout_ms: u64,

    /// Send PTR queries to this server instead of using the system resolver
    #[arg(long, value_name = "ADDR[:PORT]", global = true, env = "SWEEPR_DNS_SERVER", value_parser = parse_dns_server)]
    pub dns_server: Option<SocketAddr>,

    /// Probe method: icmp, tcp or tcp:<port>
    #[arg(long, global = true, env = "SWEEPR_METHOD", default_value_t = ProbeMethod::Icmp)]
    pub method: ProbeMethod,

    /// Refuse ranges that expand to more addresses than this
    #[arg(long, global = true, env = "SWEEPR_MAX_TARGETS", default_value_t = 65_536)]
    pub max_targets: usize,
}

impl SweepArgs {
    pub fn to_config(&self) -> SweepConfig {
        SweepConfig {
            concurrency: self.concurrency,
            probe_timeout: Duration::from_millis(self.timeout_ms),
            retry_count: self.retries,
            retry_backoff: Duration::from_millis(self.backoff_ms),
            overall_deadline: self.deadline_ms.map(Duration::from_millis),
            resolve_names: self.resolve,
            resolve_timeout: Duration::from_millis(self.resolve_timeout_ms),
            dns_server: self.dns_server,
            method: self.method,
            max_targets: self.max_targets,
        }
    }
}

/// Accepts a bare address (port 53 implied) or a full socket address.
fn parse_dns_server(s: &str) -> Result<SocketAddr, String> {
    if let Ok(addr) = s.parse::<IpAddr>() {
        return Ok(SocketAddr::new(addr, DNS_PORT));
    }
    s.parse::<SocketAddr>()
        .map_err(|_| format!("'{s}' is neither an address nor an address:port"))
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
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
