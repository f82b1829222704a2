//! # Range Specification
//!
//! Parses the textual description of what a sweep should cover and expands it
//! into concrete [`Target`]s.
//!
//! Accepted forms:
//! * A single IPv4/IPv6 address (e.g., `192.168.1.5`, `fe80::1`).
//! * A CIDR block (e.g., `192.168.1.0/24`, `2001:db8::/120`).
//! * A start-end range (e.g., `192.168.1.1-192.168.1.50`, or the short `192.168.1.1-50`).
//! * A comma separated list of the above (e.g., `10.0.0.1, 10.0.0.0/30`).

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use serde::Serialize;

use crate::error::RangeError;
use crate::network::range::{self, IpCollection, IpRange};

/// A single address to probe, remembering which part of the specification produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Target {
    addr: IpAddr,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

impl Target {
    pub fn new(addr: IpAddr) -> Self {
        Self { addr, label: None }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

impl From<IpAddr> for Target {
    fn from(addr: IpAddr) -> Self {
        Self::new(addr)
    }
}

/// Describes the address set a sweep covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeSpec {
    /// One specific host.
    Host { addr: IpAddr },
    /// A network block; host bits of `addr` are ignored.
    Cidr { addr: IpAddr, prefix: u8 },
    /// An inclusive start-end range.
    Span { start: IpAddr, end: IpAddr },
    /// Several specifications swept together.
    Multi { specs: Vec<RangeSpec> },
}

impl RangeSpec {
    /// Expands into ascending, duplicate-free targets.
    ///
    /// Fails with [`RangeError::InvalidRange`] on inconsistent bounds and with
    /// [`RangeError::RangeTooLarge`] when more than `cap` addresses would result.
    pub fn expand(&self, cap: usize) -> Result<Vec<Target>, RangeError> {
        expand(self, cap)
    }
}

impl FromStr for RangeSpec {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.is_empty() {
            return Err(RangeError::invalid(s, "empty range specification"));
        }

        if s.contains(',') {
            return parse_commas(s);
        }

        if let Some(spec) = parse_host(s) {
            return Ok(spec);
        }

        if let Some(spec) = parse_cidr_range(s)? {
            return Ok(spec);
        }

        if let Some(spec) = parse_ip_range(s)? {
            return Ok(spec);
        }

        Err(RangeError::invalid(s, "not an address, CIDR block or range"))
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeSpec::Host { addr } => write!(f, "{addr}"),
            RangeSpec::Cidr { addr, prefix } => write!(f, "{addr}/{prefix}"),
            RangeSpec::Span { start, end } => write!(f, "{start}-{end}"),
            RangeSpec::Multi { specs } => {
                for (idx, spec) in specs.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{spec}")?;
                }
                Ok(())
            }
        }
    }
}

/// Expands a specification into targets, capped at `cap` addresses.
pub fn expand(spec: &RangeSpec, cap: usize) -> Result<Vec<Target>, RangeError> {
    let mut collection = IpCollection::new();
    collect(spec, &mut collection)?;
    collection.into_targets(cap)
}

/// Shared by single and multi specifications so list members are validated alike.
fn collect(spec: &RangeSpec, collection: &mut IpCollection) -> Result<(), RangeError> {
    match spec {
        RangeSpec::Host { addr } => {
            collection.add_single(*addr, spec.to_string());
        }
        RangeSpec::Cidr { addr, prefix } => {
            let range = range::cidr_range(*addr, *prefix)
                .map_err(|reason| RangeError::invalid(spec.to_string(), reason))?;
            collection.add_range(range, spec.to_string());
        }
        RangeSpec::Span { start, end } => {
            let range = IpRange::new(*start, *end)
                .map_err(|reason| RangeError::invalid(spec.to_string(), reason))?;
            collection.add_range(range, spec.to_string());
        }
        RangeSpec::Multi { specs } => {
            for spec in specs {
                collect(spec, collection)?;
            }
        }
    }
    Ok(())
}

/// Parses a comma-separated list (e.g., "192.168.1.5, 10.0.0.1-50").
fn parse_commas(s: &str) -> Result<RangeSpec, RangeError> {
    let mut specs = Vec::new();

    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        specs.push(RangeSpec::from_str(part)?);
    }

    if specs.is_empty() {
        return Err(RangeError::invalid(s, "list contains no ranges"));
    }

    Ok(RangeSpec::Multi { specs })
}

fn parse_host(s: &str) -> Option<RangeSpec> {
    s.parse::<IpAddr>().ok().map(|addr| RangeSpec::Host { addr })
}

/// Parses CIDR notation like "192.168.1.0/24".
fn parse_cidr_range(s: &str) -> Result<Option<RangeSpec>, RangeError> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Ok(None);
    };

    let addr = ip_str
        .trim()
        .parse::<IpAddr>()
        .map_err(|e| RangeError::invalid(ip_str, format!("invalid address in CIDR: {e}")))?;

    let prefix = prefix_str
        .trim()
        .parse::<u8>()
        .map_err(|e| RangeError::invalid(prefix_str, format!("invalid prefix in CIDR: {e}")))?;

    range::cidr_range(addr, prefix).map_err(|reason| RangeError::invalid(s, reason))?;

    Ok(Some(RangeSpec::Cidr { addr, prefix }))
}

/// Parses a range like "1.1.1.1-2.2.2.2", "1.1.1.1-50" or "fe80::1-fe80::ff".
fn parse_ip_range(s: &str) -> Result<Option<RangeSpec>, RangeError> {
    let Some((start_str, end_str)) = s.split_once('-') else {
        return Ok(None);
    };

    let start = start_str
        .trim()
        .parse::<IpAddr>()
        .map_err(|e| RangeError::invalid(start_str, format!("invalid start address: {e}")))?;

    let end = parse_range_end_addr(end_str.trim(), &start, s)?;

    IpRange::new(start, end).map_err(|reason| RangeError::invalid(s, reason))?;

    Ok(Some(RangeSpec::Span { start, end }))
}

/// Parses the end address of a range.
///
/// Handles abbreviated IPv4 forms like "192.168.1.1-50" (implies 192.168.1.50)
/// as well as full addresses of either family.
fn parse_range_end_addr(end_str: &str, start: &IpAddr, original_s: &str) -> Result<IpAddr, RangeError> {
    if let Ok(full_addr) = end_str.parse::<IpAddr>() {
        return Ok(full_addr);
    }

    let IpAddr::V4(start_v4) = start else {
        return Err(RangeError::invalid(end_str, "invalid end address"));
    };

    if end_str.is_empty() {
        return Err(RangeError::invalid(original_s, "end of range cannot be empty"));
    }

    let partial_octets: Vec<u8> = end_str
        .split('.')
        .map(|octet_str| octet_str.parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| RangeError::invalid(end_str, format!("invalid end of range: {e}")))?;

    if partial_octets.len() > 4 {
        return Err(RangeError::invalid(end_str, "end of range has too many octets"));
    }

    let mut end_octets = start_v4.octets();
    let start_index = 4 - partial_octets.len();
    end_octets[start_index..].copy_from_slice(&partial_octets);

    Ok(IpAddr::V4(Ipv4Addr::from(end_octets)))
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

    const CAP: usize = 65_536;

    fn addrs(spec: &str) -> Vec<IpAddr> {
        spec.parse::<RangeSpec>()
            .unwrap()
            .expand(CAP)
            .unwrap()
            .iter()
            .map(Target::addr)
            .collect()
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_range_end_addr_helper() {
        let start = ip("192.168.1.10");
        let s = "192.168.1.10-255";

        assert_eq!(parse_range_end_addr("192.168.1.50", &start, s), Ok(ip("192.168.1.50")));
        assert_eq!(parse_range_end_addr("50", &start, s), Ok(ip("192.168.1.50")));
        assert_eq!(parse_range_end_addr("2.66", &start, s), Ok(ip("192.168.2.66")));
        assert_eq!(parse_range_end_addr("10.2.1", &start, s), Ok(ip("192.10.2.1")));

        assert!(parse_range_end_addr("2.256", &start, s).is_err());
        assert!(parse_range_end_addr("1.2.3.4.5", &start, s).is_err());
        assert!(parse_range_end_addr("", &start, s).is_err());
        assert!(parse_range_end_addr("ff", &ip("fe80::1"), s).is_err());
    }

    #[test]
    fn test_from_str_full_parsing() {
        assert!(matches!(RangeSpec::from_str("1.1.1.1"), Ok(RangeSpec::Host { .. })));
        assert!(matches!(RangeSpec::from_str("::1"), Ok(RangeSpec::Host { .. })));
        assert!(matches!(RangeSpec::from_str(" 10.0.0.0/24 "), Ok(RangeSpec::Cidr { prefix: 24, .. })));
        assert!(matches!(RangeSpec::from_str("2001:db8::/64"), Ok(RangeSpec::Cidr { prefix: 64, .. })));
        assert!(matches!(RangeSpec::from_str("10.0.0.1-10.0.0.255"), Ok(RangeSpec::Span { .. })));
        assert!(matches!(RangeSpec::from_str("192.168.1.1-255"), Ok(RangeSpec::Span { .. })));
        assert!(matches!(RangeSpec::from_str("fe80::1-fe80::ff"), Ok(RangeSpec::Span { .. })));
        assert!(matches!(RangeSpec::from_str("10.0.0.1, 10.0.0.0/30"), Ok(RangeSpec::Multi { .. })));

        assert!(RangeSpec::from_str("not-an-ip").is_err());
        assert!(RangeSpec::from_str("").is_err());
        assert!(RangeSpec::from_str(" , ").is_err());
        assert!(RangeSpec::from_str("10.0.0.1/33").is_err());
        assert!(RangeSpec::from_str("10.0.0.256-1.1.1.1").is_err());
    }

    #[test]
    fn test_invalid_range_reports_offending_input() {
        let err = RangeSpec::from_str("10.0.0.0/abc").unwrap_err();
        assert!(matches!(err, RangeError::InvalidRange { ref input, .. } if input == "abc"));

        let err = RangeSpec::from_str("10.0.0.9-10.0.0.1").unwrap_err();
        assert!(matches!(err, RangeError::InvalidRange { ref input, .. } if input == "10.0.0.9-10.0.0.1"));

        let err = RangeSpec::from_str("10.0.0.1-::1").unwrap_err();
        assert!(matches!(err, RangeError::InvalidRange { .. }));
    }

    #[test]
    fn test_expand_validates_programmatic_specs() {
        let spec = RangeSpec::Span { start: ip("10.0.0.9"), end: ip("10.0.0.1") };
        assert!(matches!(spec.expand(CAP), Err(RangeError::InvalidRange { .. })));

        let spec = RangeSpec::Span { start: ip("10.0.0.1"), end: ip("::2") };
        assert!(matches!(spec.expand(CAP), Err(RangeError::InvalidRange { .. })));
    }

    #[test]
    fn test_expand_slash_30_excludes_network_and_broadcast() {
        assert_eq!(addrs("192.168.1.0/30"), vec![ip("192.168.1.1"), ip("192.168.1.2")]);
    }

    #[test]
    fn test_expand_slash_32_keeps_host() {
        assert_eq!(addrs("10.0.0.5/32"), vec![ip("10.0.0.5")]);
    }

    #[test]
    fn test_expand_host_counts_per_prefix() {
        for prefix in 16u8..=32 {
            let expected: usize = match prefix {
                31 => 2,
                32 => 1,
                p => (1usize << (32 - p)) - 2,
            };
            assert_eq!(addrs(&format!("172.16.0.0/{prefix}")).len(), expected, "/{prefix}");
        }
    }

    #[test]
    fn test_expand_masks_host_bits() {
        assert_eq!(addrs("10.1.2.3/30"), vec![ip("10.1.2.1"), ip("10.1.2.2")]);
    }

    #[test]
    fn test_expand_overlapping_list_is_unique_and_sorted() {
        let targets = addrs("10.0.0.8-10.0.0.12, 10.0.0.0/29, 10.0.0.10, 10.0.0.1-3");
        let mut deduped = targets.clone();
        deduped.dedup();
        assert_eq!(targets, deduped);
        assert!(targets.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(targets.len(), 11);
        assert_eq!(targets.first(), Some(&ip("10.0.0.1")));
        assert_eq!(targets.last(), Some(&ip("10.0.0.12")));
    }

    #[test]
    fn test_expand_mixed_families_sorts_ipv4_first() {
        let targets = addrs("::2, 10.0.0.1, ::1");
        assert_eq!(targets, vec![ip("10.0.0.1"), ip("::1"), ip("::2")]);
    }

    #[test]
    fn test_expand_labels_come_from_the_spec_part() {
        let spec: RangeSpec = "10.0.0.1, 10.0.0.0/30".parse().unwrap();
        let targets = spec.expand(CAP).unwrap();
        assert_eq!(targets[0].label(), Some("10.0.0.1"));
        assert_eq!(targets[1].label(), Some("10.0.0.0/30"));
    }

    #[test]
    fn test_expand_rejects_oversized_range() {
        let spec: RangeSpec = "10.0.0.0/8".parse().unwrap();
        assert!(matches!(
            spec.expand(CAP),
            Err(RangeError::RangeTooLarge { requested: 16_777_214, cap: CAP })
        ));

        let spec: RangeSpec = "2001:db8::/32".parse().unwrap();
        assert!(matches!(spec.expand(CAP), Err(RangeError::RangeTooLarge { .. })));
    }

    #[test]
    fn test_display_round_trips() {
        let spec: RangeSpec = "192.168.1.1-50".parse().unwrap();
        assert_eq!(spec.to_string(), "192.168.1.1-192.168.1.50");

        let spec: RangeSpec = "10.0.0.1,10.0.0.0/30".parse().unwrap();
        assert_eq!(spec.to_string(), "10.0.0.1, 10.0.0.0/30");
        assert_eq!(spec.to_string().parse::<RangeSpec>().unwrap(), spec);
    }
}
