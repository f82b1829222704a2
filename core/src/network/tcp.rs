use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sweepr_common::network::report::{ProbeErrorKind, ProbeResult};
use sweepr_common::network::target::Target;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

use crate::network::classify_io_error;
use crate::scanner::Prober;

/// Liveness through a TCP handshake on a single port.
///
/// A completed handshake and an outright refusal both prove that something at
/// the address answered, so both count as reachable.
#[derive(Debug, Clone, Copy)]
pub struct TcpProber {
    port: u16,
}

impl TcpProber {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, target: &Target, probe_timeout: Duration) -> ProbeResult {
        let socket_addr: SocketAddr = SocketAddr::new(target.addr(), self.port);
        let started: Instant = Instant::now();

        match timeout(probe_timeout, TcpStream::connect(socket_addr)).await {
            Ok(Ok(_stream)) => ProbeResult::up(target.clone(), started.elapsed()),
            Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => {
                ProbeResult::up(target.clone(), started.elapsed())
            }
            Ok(Err(e)) => {
                trace!("Handshake with {socket_addr} failed: {e}");
                ProbeResult::down(target.clone(), classify_io_error(&e))
            }
            Err(_elapsed) => ProbeResult::down(target.clone(), ProbeErrorKind::Timeout),
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
