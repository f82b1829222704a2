use std::fmt::Write;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Width of the address family in bits.
pub fn family_width(ip_addr: &IpAddr) -> u8 {
    match ip_addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// Numeric value of an address. IPv4 occupies the low 32 bits.
pub fn to_bits(ip_addr: &IpAddr) -> u128 {
    match ip_addr {
        IpAddr::V4(ipv4_addr) => u32::from(*ipv4_addr) as u128,
        IpAddr::V6(ipv6_addr) => u128::from(*ipv6_addr),
    }
}

/// Inverse of [`to_bits`]. For IPv4 only the low 32 bits are used.
pub fn from_bits(bits: u128, is_ipv4: bool) -> IpAddr {
    if is_ipv4 {
        IpAddr::V4(Ipv4Addr::from(bits as u32))
    } else {
        IpAddr::V6(Ipv6Addr::from(bits))
    }
}

pub fn same_family(a: &IpAddr, b: &IpAddr) -> bool {
    a.is_ipv4() == b.is_ipv4()
}

/// Builds the reverse-lookup domain for an address.
///
/// `192.168.1.10` becomes `10.1.168.192.in-addr.arpa`, IPv6 addresses are
/// expanded nibble by nibble under `ip6.arpa`.
pub fn reverse_address_to_ptr(ip_addr: &IpAddr) -> String {
    match ip_addr {
        IpAddr::V4(ipv4_addr) => {
            let [a, b, c, d] = ipv4_addr.octets();
            format!("{d}.{c}.{b}.{a}.in-addr.arpa")
        }
        IpAddr::V6(ipv6_addr) => {
            let mut name = String::with_capacity(72);
            for byte in ipv6_addr.octets().iter().rev() {
                let _ = write!(name, "{:x}.{:x}.", byte & 0x0f, byte >> 4);
            }
            name.push_str("ip6.arpa");
            name
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
