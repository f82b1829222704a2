use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;

use colored::*;
use sweepr_core::discovery::{InventoryRecord, Tag};
use sweepr_common::network::report::ProbeResult;

use crate::terminal::colors;

pub type Detail = (String, ColoredString);

pub fn ipv6_to_type_str(ipv6_addr: &Ipv6Addr) -> &'static str {
    let first_byte = ipv6_addr.octets()[0];
    if (0x20..=0x3f).contains(&first_byte) {
        return "GUA";
    }
    if ipv6_addr.is_unique_local() {
        return "ULA";
    }
    if ipv6_addr.is_unicast_link_local() {
        return "LLA";
    }
    "IPv6"
}

pub fn addr_to_detail(addr: &IpAddr) -> Detail {
    match addr {
        IpAddr::V4(ipv4_addr) => (String::from("IPv4"), ipv4_addr.to_string().color(colors::IPV4_ADDR)),
        IpAddr::V6(ipv6_addr) => (
            String::from(ipv6_to_type_str(ipv6_addr)),
            ipv6_addr.to_string().color(colors::IPV6_ADDR),
        ),
    }
}

/// Sub-millisecond latencies keep two decimals, the rest one.
pub fn format_latency(latency: Duration) -> String {
    let millis: f64 = latency.as_secs_f64() * 1_000.0;
    if millis < 1.0 {
        format!("{millis:.2}ms")
    } else {
        format!("{millis:.1}ms")
    }
}

pub fn result_to_details(result: &ProbeResult) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![addr_to_detail(&result.addr())];

    if let Some(latency) = result.latency() {
        details.push(("Latency".to_string(), format_latency(latency).color(colors::ACCENT)));
    }
    if let Some(error) = result.error() {
        details.push(("Error".to_string(), error.to_string().color(colors::OFFLINE)));
    }
    if let Some(label) = result.target().label() {
        details.push(("Range".to_string(), label.color(colors::TEXT_DEFAULT)));
    }
    details
}

pub fn tags_to_detail(tags: &BTreeSet<Tag>) -> Option<Detail> {
    if tags.is_empty() {
        return None;
    }
    let joined: String = tags
        .iter()
        .map(|tag| tag.slug().color(colors::tag_color(*tag)).to_string())
        .collect::<Vec<String>>()
        .join(", ");
    Some(("Tags".to_string(), joined.normal()))
}

pub fn record_to_details(record: &InventoryRecord) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![addr_to_detail(&record.address)];

    let status: ColoredString = if record.up_down {
        "up".color(colors::ONLINE).bold()
    } else {
        "down".color(colors::OFFLINE).bold()
    };
    details.push(("Status".to_string(), status));

    if let Some(tags) = tags_to_detail(&record.tags) {
        details.push(tags);
    }
    if let Some(date) = record.auto_discovered {
        details.push(("Found".to_string(), date.to_string().color(colors::DISCOVERED)));
    }
    details
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
