//! ICMP echo probing on top of `surge-ping`.
//!
//! One client per address family is opened up front. Without raw-socket
//! privileges the kernel's unprivileged ping sockets are used, and when
//! neither is available every probe of that family reports a send error.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use surge_ping::{Client, Config as PingConfig, ICMP, PingIdentifier, PingSequence, SurgeError};
use sweepr_common::network::report::{ProbeErrorKind, ProbeResult};
use sweepr_common::network::target::Target;
use sweepr_common::warn;
use tracing::{debug, trace};

use crate::network::classify_io_error;
use crate::scanner::Prober;

const PAYLOAD: [u8; 56] = [0; 56];

pub struct IcmpProber {
    v4: Option<Client>,
    v6: Option<Client>,
    sequence: AtomicU16,
}

impl IcmpProber {
    /// Opens the ICMP sockets. Must run inside a tokio runtime.
    pub fn new() -> Self {
        if !is_root::is_root() {
            debug!("Not running as root, relying on unprivileged ping sockets");
        }

        Self {
            v4: open_client(ICMP::V4, "IPv4"),
            v6: open_client(ICMP::V6, "IPv6"),
            sequence: AtomicU16::new(0),
        }
    }

    fn client_for(&self, addr: &IpAddr) -> Option<&Client> {
        match addr {
            IpAddr::V4(_) => self.v4.as_ref(),
            IpAddr::V6(_) => self.v6.as_ref(),
        }
    }
}

impl Default for IcmpProber {
    fn default() -> Self {
        Self::new()
    }
}

fn open_client(kind: ICMP, family: &str) -> Option<Client> {
    let config: PingConfig = PingConfig::builder().kind(kind).build();
    match Client::new(&config) {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("Cannot open an {family} ICMP socket, {family} targets will not be probed: {e}");
            None
        }
    }
}

#[async_trait]
impl Prober for IcmpProber {
    async fn probe(&self, target: &Target, probe_timeout: Duration) -> ProbeResult {
        let addr: IpAddr = target.addr();
        let Some(client) = self.client_for(&addr) else {
            return ProbeResult::down(target.clone(), ProbeErrorKind::SendError);
        };

        let mut pinger = client.pinger(addr, PingIdentifier(rand::random())).await;
        pinger.timeout(probe_timeout);
        let sequence = PingSequence(self.sequence.fetch_add(1, Ordering::Relaxed));

        match pinger.ping(sequence, &PAYLOAD).await {
            Ok((_reply, rtt)) => ProbeResult::up(target.clone(), rtt),
            Err(SurgeError::Timeout { .. }) => ProbeResult::down(target.clone(), ProbeErrorKind::Timeout),
            Err(SurgeError::IOError(e)) => {
                trace!("Echo request to {addr} failed: {e}");
                ProbeResult::down(target.clone(), classify_io_error(&e))
            }
            Err(e) => {
                trace!("Echo request to {addr} failed: {e}");
                ProbeResult::down(target.clone(), ProbeErrorKind::SendError)
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    // Needs ICMP sockets, which CI sandboxes rarely grant.
    #[tokio::test]
    #[ignore]
    async fn echo_to_loopback_is_answered() {
        let prober = IcmpProber::new();
        let target = Target::new(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let result = prober.probe(&target, Duration::from_secs(1)).await;
        assert!(result.is_reachable());
    }

    #[tokio::test]
    async fn missing_client_reports_send_error() {
        let prober = IcmpProber {
            v4: None,
            v6: None,
            sequence: AtomicU16::new(0),
        };
        let target = Target::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        let result = prober.probe(&target, Duration::from_millis(10)).await;
        assert_eq!(result.error(), Some(ProbeErrorKind::SendError));
    }
}
