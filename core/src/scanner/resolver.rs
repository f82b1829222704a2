use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    sync::atomic::{AtomicU16, Ordering},
    time::Duration,
};

use anyhow::Context;
use async_trait::async_trait;
use sweepr_common::network::target::Target;
use sweepr_protocols::dns;
use tokio::{net::UdpSocket, time::timeout};
use tracing::{debug, trace};

use crate::scanner::NameResolver;

const MAX_DNS_PAYLOAD: usize = 1_500;

/// Reverse lookups through the operating system's resolver.
///
/// `getnameinfo` blocks, so every lookup runs on the blocking pool. A lookup
/// that outlives its timeout is abandoned there rather than cancelled; the
/// binary caps how long exit waits for such lookups.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl NameResolver for SystemResolver {
    async fn resolve(&self, target: &Target, resolve_timeout: Duration) -> Option<String> {
        let addr: IpAddr = target.addr();
        let lookup = tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&addr));

        match timeout(resolve_timeout, lookup).await {
            Ok(Ok(Ok(name))) => usable_name(name),
            Ok(Ok(Err(e))) => {
                trace!("Reverse lookup of {addr} failed: {e}");
                None
            }
            Ok(Err(e)) => {
                debug!("Reverse lookup task for {addr} died: {e}");
                None
            }
            Err(_elapsed) => {
                trace!("Reverse lookup of {addr} timed out");
                None
            }
        }
    }
}

/// Reverse lookups sent as PTR queries straight to one DNS server.
pub struct PtrResolver {
    server: SocketAddr,
    id_counter: AtomicU16,
}

impl PtrResolver {
    pub fn new(server: SocketAddr) -> Self {
        Self {
            server,
            id_counter: AtomicU16::new(rand::random()),
        }
    }

    async fn query(&self, ip: &IpAddr) -> anyhow::Result<String> {
        let id: u16 = self.get_next_trans_id();
        let bytes: Vec<u8> = dns::create_ptr_packet(ip, id)?;

        let bind_addr: SocketAddr = match self.server {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(bind_addr).await.context("binding DNS socket")?;
        socket
            .connect(self.server)
            .await
            .with_context(|| format!("connecting to DNS server {}", self.server))?;
        socket.send(&bytes).await.context("sending PTR query")?;

        let mut buffer = [0u8; MAX_DNS_PAYLOAD];
        loop {
            let len: usize = socket.recv(&mut buffer).await.context("receiving DNS response")?;
            let response: &[u8] = &buffer[..len];

            // Stray datagrams and late answers to other queries are skipped.
            if response.len() < 2 || u16::from_be_bytes([response[0], response[1]]) != id {
                trace!("Ignoring DNS datagram that does not answer query {id}");
                continue;
            }

            let (_, hostname) = dns::get_hostname(response)?;
            return Ok(hostname);
        }
    }

    fn get_next_trans_id(&self) -> u16 {
        self.id_counter.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl NameResolver for PtrResolver {
    async fn resolve(&self, target: &Target, resolve_timeout: Duration) -> Option<String> {
        let addr: IpAddr = target.addr();
        match timeout(resolve_timeout, self.query(&addr)).await {
            Ok(Ok(hostname)) => usable_name(hostname),
            Ok(Err(e)) => {
                trace!("PTR lookup of {addr} via {} failed: {e:#}", self.server);
                None
            }
            Err(_elapsed) => {
                trace!("PTR lookup of {addr} via {} timed out", self.server);
                None
            }
        }
    }
}

/// Drops the trailing root dot and rejects answers that merely echo an address.
fn usable_name(name: String) -> Option<String> {
    let name: &str = name.trim_end_matches('.');
    if name.is_empty() || name.parse::<IpAddr>().is_ok() {
        return None;
    }
    Some(name.to_string())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
