//! Reverse (PTR) lookups on the wire.
//!
//! Queries are assembled with `pnet`'s DNS header type. Responses, including
//! names compressed into pointers back at the question, are decoded with
//! `dns-parser`.

use std::net::IpAddr;

use anyhow::{Context, bail, ensure};
use dns_parser::{Packet, RData, ResponseCode};
use pnet::packet::dns::{DnsClass, DnsQuery, DnsTypes, MutableDnsPacket, Opcode, Retcode};

use sweepr_common::utils::ip;

pub const DNS_HDR_LEN: usize = 12;
pub const DNS_PORT: u16 = 53;

/// Extracts the transaction id and the first PTR name from a DNS response.
pub fn get_hostname(payload: &[u8]) -> anyhow::Result<(u16, String)> {
    let packet: Packet = Packet::parse(payload).context("malformed DNS message")?;
    let transaction_id: u16 = packet.header.id;

    ensure!(!packet.header.query, "DNS message {transaction_id} is not a response");
    let rcode: ResponseCode = packet.header.response_code;
    if !matches!(rcode, ResponseCode::NoError) {
        bail!("DNS response {transaction_id} failed with {rcode:?}");
    }

    packet
        .answers
        .iter()
        .find_map(|answer| match &answer.data {
            RData::PTR(record) => Some(record.0.to_string()),
            _ => None,
        })
        .map(|hostname| (transaction_id, hostname))
        .with_context(|| format!("No PTR record found in DNS response {transaction_id}"))
}

/// Builds a recursive PTR query for `ip_addr` with transaction id `id`.
pub fn create_ptr_packet(ip_addr: &IpAddr, id: u16) -> anyhow::Result<Vec<u8>> {
    let query: DnsQuery = create_ptr_query(ip_addr)?;
    let q_fixed_len: usize = 4;
    let qlen: usize = query.qname.len() + q_fixed_len;
    let total: usize = DNS_HDR_LEN + qlen;
    let mut buffer: Vec<u8> = vec![0u8; total];

    {
        let mut dns: MutableDnsPacket =
            MutableDnsPacket::new(&mut buffer).context("creating dns header")?;
        dns.set_id(id);
        dns.set_is_response(0);
        dns.set_opcode(Opcode::StandardQuery);
        dns.set_is_authoriative(0);
        dns.set_is_truncated(0);
        dns.set_is_recursion_desirable(1);
        dns.set_is_recursion_available(0);
        dns.set_zero_reserved(0);
        dns.set_is_non_authenticated_data(0);
        dns.set_rcode(Retcode::NoError);
        dns.set_query_count(1);
        dns.set_response_count(0);
        dns.set_authority_rr_count(0);
        dns.set_additional_rr_count(0);
    }

    let mut cursor: usize = DNS_HDR_LEN;

    buffer[cursor..cursor + query.qname.len()].copy_from_slice(&query.qname);
    cursor += query.qname.len();

    buffer[cursor..cursor + 2].copy_from_slice(&query.qtype.0.to_be_bytes());
    cursor += 2;

    buffer[cursor..cursor + 2].copy_from_slice(&query.qclass.0.to_be_bytes());

    Ok(buffer)
}

fn create_ptr_query(ip_addr: &IpAddr) -> anyhow::Result<DnsQuery> {
    let ptr_string: String = ip::reverse_address_to_ptr(ip_addr);
    let qname: Vec<u8> = encode_dns_name(&ptr_string)?;
    Ok(DnsQuery {
        qname,
        qtype: DnsTypes::PTR,
        qclass: DnsClass(1),
        payload: Vec::new(),
    })
}

fn encode_dns_name(name: &str) -> anyhow::Result<Vec<u8>> {
    let mut encoded: Vec<u8> = Vec::with_capacity(name.len() + 2);
    for label in name.split('.') {
        if label.is_empty() {
            continue;
        }
        ensure!(label.len() < 64, "DNS label '{label}' exceeds 63 bytes");
        encoded.push(label.len() as u8);
        encoded.extend_from_slice(label.as_bytes());
    }
    encoded.push(0);
    Ok(encoded)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
