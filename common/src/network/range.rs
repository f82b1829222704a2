//! # Address Ranges
//!
//! Contiguous, inclusive address ranges and the [`IpCollection`] that merges
//! any number of them into one ascending, duplicate-free target list.

use std::collections::BTreeMap;
use std::net::IpAddr;

use pnet::ipnetwork::IpNetwork;

use crate::error::RangeError;
use crate::network::target::Target;
use crate::utils::ip;

/// An inclusive range of addresses of a single family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IpRange {
    pub start_addr: IpAddr,
    pub end_addr: IpAddr,
}

impl IpRange {
    /// Builds a range, rejecting mixed families and reversed bounds.
    pub fn new(start_addr: IpAddr, end_addr: IpAddr) -> Result<Self, String> {
        if !ip::same_family(&start_addr, &end_addr) {
            return Err(format!(
                "{start_addr} and {end_addr} belong to different address families"
            ));
        }
        if ip::to_bits(&start_addr) > ip::to_bits(&end_addr) {
            return Err(format!("start {start_addr} is greater than end {end_addr}"));
        }
        Ok(Self {
            start_addr,
            end_addr,
        })
    }

    pub fn single(addr: IpAddr) -> Self {
        Self {
            start_addr: addr,
            end_addr: addr,
        }
    }

    pub fn is_ipv4(&self) -> bool {
        self.start_addr.is_ipv4()
    }

    /// Number of addresses in the range.
    pub fn len(&self) -> u128 {
        // A full IPv6 range holds 2^128 addresses, which saturates.
        (self.end_bits() - self.start_bits()).saturating_add(1)
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = IpAddr> {
        let is_ipv4 = self.is_ipv4();
        (self.start_bits()..=self.end_bits()).map(move |bits| ip::from_bits(bits, is_ipv4))
    }

    fn start_bits(&self) -> u128 {
        ip::to_bits(&self.start_addr)
    }

    fn end_bits(&self) -> u128 {
        ip::to_bits(&self.end_addr)
    }
}

/// Returns the probe-worthy hosts of `ip/prefix`.
///
/// Network and broadcast addresses are dropped while the block has at least
/// four addresses. `/31` and `/32` (`/127` and `/128` for IPv6) keep every address.
pub fn cidr_range(ip: IpAddr, prefix: u8) -> Result<IpRange, String> {
    let network = IpNetwork::new(ip, prefix).map_err(|e| e.to_string())?;
    let width: u8 = ip::family_width(&ip);
    let host_bits: u32 = u32::from(width - network.prefix());

    let span: u128 = if host_bits >= 128 {
        u128::MAX
    } else {
        (1u128 << host_bits) - 1
    };
    let first: u128 = ip::to_bits(&network.ip()) & !span;
    let last: u128 = first | span;

    let (start, end) = if host_bits >= 2 {
        (first + 1, last - 1)
    } else {
        (first, last)
    };

    let is_ipv4 = ip.is_ipv4();
    Ok(IpRange {
        start_addr: ip::from_bits(start, is_ipv4),
        end_addr: ip::from_bits(end, is_ipv4),
    })
}

/// Accumulates ranges and flattens them into unique, ordered targets.
#[derive(Debug, Clone, Default)]
pub struct IpCollection {
    parts: Vec<(IpRange, String)>,
}

impl IpCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a range; `label` names the specification it came from.
    pub fn add_range(&mut self, range: IpRange, label: impl Into<String>) {
        self.parts.push((range, label.into()));
    }

    pub fn add_single(&mut self, addr: IpAddr, label: impl Into<String>) {
        self.add_range(IpRange::single(addr), label);
    }

    /// Number of distinct addresses, computed without enumerating them.
    pub fn len(&self) -> u128 {
        let mut sorted: Vec<(bool, u128, u128)> = self
            .parts
            .iter()
            .map(|(range, _)| (!range.is_ipv4(), range.start_bits(), range.end_bits()))
            .collect();
        sorted.sort_unstable();

        let mut total: u128 = 0;
        let mut current: Option<(bool, u128, u128)> = None;
        for (is_ipv6, start, end) in sorted {
            match current {
                Some((family, cur_start, cur_end))
                    if family == is_ipv6 && start <= cur_end.saturating_add(1) =>
                {
                    current = Some((family, cur_start, cur_end.max(end)));
                }
                Some((_, cur_start, cur_end)) => {
                    total = total.saturating_add((cur_end - cur_start).saturating_add(1));
                    current = Some((is_ipv6, start, end));
                }
                None => current = Some((is_ipv6, start, end)),
            }
        }
        if let Some((_, cur_start, cur_end)) = current {
            total = total.saturating_add((cur_end - cur_start).saturating_add(1));
        }
        total
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Materialises the collection, refusing to allocate beyond `cap` targets.
    ///
    /// An address covered by several parts keeps the label of the first one added.
    pub fn into_targets(self, cap: usize) -> Result<Vec<Target>, RangeError> {
        let requested: u128 = self.len();
        if requested > cap as u128 {
            return Err(RangeError::RangeTooLarge { requested, cap });
        }

        let mut unique: BTreeMap<IpAddr, String> = BTreeMap::new();
        for (range, label) in self.parts {
            for addr in range.iter() {
                unique.entry(addr).or_insert_with(|| label.clone());
            }
        }

        Ok(unique
            .into_iter()
            .map(|(addr, label)| Target::new(addr).with_label(label))
            .collect())
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
