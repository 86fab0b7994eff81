//! Address range classification for IPv4 and IPv6 literals.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::Serialize;

/// The range an IP address falls in, derived purely from its numeric value.
///
/// Everything except [`AddressRange::Public`] is rejected by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressRange {
    /// Routable address outside every reserved range below.
    Public,
    /// RFC 1918: `10/8`, `172.16/12`, `192.168/16`.
    Private,
    /// `127/8` and `::1`.
    Loopback,
    /// `169.254/16` and `fe80::/10`.
    LinkLocal,
    /// `fc00::/7`.
    UniqueLocal,
    /// `0/8` ("this network") and `::`.
    Unspecified,
    /// `100.64/10` shared address space (RFC 6598).
    CarrierGradeNat,
    /// IPv6 address embedding an IPv4 one: `::ffff:a.b.c.d` and the
    /// deprecated `::a.b.c.d` compatible form. Judge it by [`embedded_ipv4`].
    Ipv4MappedIpv6,
}

impl AddressRange {
    /// Whether the range may be fetched.
    pub fn is_public(self) -> bool {
        self == AddressRange::Public
    }

    /// Stable name, as used in logs and serialized output.
    pub fn as_str(self) -> &'static str {
        match self {
            AddressRange::Public => "public",
            AddressRange::Private => "private",
            AddressRange::Loopback => "loopback",
            AddressRange::LinkLocal => "link-local",
            AddressRange::UniqueLocal => "unique-local",
            AddressRange::Unspecified => "unspecified",
            AddressRange::CarrierGradeNat => "carrier-grade-nat",
            AddressRange::Ipv4MappedIpv6 => "ipv4-mapped-ipv6",
        }
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an IP address.
pub fn classify(ip: IpAddr) -> AddressRange {
    match ip {
        IpAddr::V4(v4) => classify_v4(v4),
        IpAddr::V6(v6) => classify_v6(v6),
    }
}

fn classify_v4(ip: Ipv4Addr) -> AddressRange {
    let [a, b, _, _] = ip.octets();
    match (a, b) {
        (0, _) => AddressRange::Unspecified,
        (127, _) => AddressRange::Loopback,
        (10, _) => AddressRange::Private,
        (172, 16..=31) => AddressRange::Private,
        (192, 168) => AddressRange::Private,
        (169, 254) => AddressRange::LinkLocal,
        (100, 64..=127) => AddressRange::CarrierGradeNat,
        _ => AddressRange::Public,
    }
}

fn classify_v6(ip: Ipv6Addr) -> AddressRange {
    // :: and ::1 sit inside ::/96, so check them before the embedded forms
    if ip.is_unspecified() {
        return AddressRange::Unspecified;
    }
    if ip.is_loopback() {
        return AddressRange::Loopback;
    }
    if embedded_ipv4(ip).is_some() {
        return AddressRange::Ipv4MappedIpv6;
    }

    // NAT64 (64:ff9b::/96) and IPv4-translated (::ffff:0:0:0/96) prefixes
    // are classified as public; only the mapped and compatible forms above
    // are unwrapped.
    let first = ip.segments()[0];
    if first & 0xfe00 == 0xfc00 {
        return AddressRange::UniqueLocal;
    }
    if first & 0xffc0 == 0xfe80 {
        return AddressRange::LinkLocal;
    }
    AddressRange::Public
}

/// Extract the IPv4 address embedded in an IPv4-mapped (`::ffff:0:0/96`) or
/// IPv4-compatible (`::/96`) IPv6 address.
///
/// `::` and `::1` are not treated as embedding anything.
pub fn embedded_ipv4(ip: Ipv6Addr) -> Option<Ipv4Addr> {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return Some(v4);
    }

    let segments = ip.segments();
    if segments[..6] == [0, 0, 0, 0, 0, 0] && (segments[6] != 0 || segments[7] > 1) {
        let [.., a, b, c, d] = ip.octets();
        return Some(Ipv4Addr::new(a, b, c, d));
    }
    None
}

/// Classify an address, looking through IPv4 embedding.
///
/// This is the range the guard actually judges: an IPv4-mapped address is
/// as public as the IPv4 address it carries.
pub fn effective_range(ip: IpAddr) -> AddressRange {
    match ip {
        IpAddr::V6(v6) => match embedded_ipv4(v6) {
            Some(v4) => classify_v4(v4),
            None => classify_v6(v6),
        },
        IpAddr::V4(v4) => classify_v4(v4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(s: &str) -> AddressRange {
        classify(s.parse().unwrap())
    }

    fn effective(s: &str) -> AddressRange {
        effective_range(s.parse().unwrap())
    }

    #[test]
    fn test_ipv4_ranges() {
        assert_eq!(range("127.0.0.1"), AddressRange::Loopback);
        assert_eq!(range("127.255.255.255"), AddressRange::Loopback);
        assert_eq!(range("10.0.0.5"), AddressRange::Private);
        assert_eq!(range("192.168.1.5"), AddressRange::Private);
        assert_eq!(range("169.254.169.254"), AddressRange::LinkLocal);
        assert_eq!(range("0.0.0.0"), AddressRange::Unspecified);
        assert_eq!(range("0.1.2.3"), AddressRange::Unspecified);
        assert_eq!(range("100.64.0.1"), AddressRange::CarrierGradeNat);
        assert_eq!(range("1.1.1.1"), AddressRange::Public);
        assert_eq!(range("93.184.216.34"), AddressRange::Public);
    }

    #[test]
    fn test_172_band_boundaries() {
        assert_eq!(range("172.15.255.255"), AddressRange::Public);
        assert_eq!(range("172.16.0.0"), AddressRange::Private);
        assert_eq!(range("172.31.255.255"), AddressRange::Private);
        assert_eq!(range("172.32.0.0"), AddressRange::Public);
    }

    #[test]
    fn test_private_range_boundaries() {
        assert_eq!(range("9.255.255.255"), AddressRange::Public);
        assert_eq!(range("11.0.0.0"), AddressRange::Public);
        assert_eq!(range("192.167.255.255"), AddressRange::Public);
        assert_eq!(range("192.169.0.0"), AddressRange::Public);
    }

    #[test]
    fn test_cgnat_boundaries() {
        assert_eq!(range("100.63.255.255"), AddressRange::Public);
        assert_eq!(range("100.127.255.255"), AddressRange::CarrierGradeNat);
        assert_eq!(range("100.128.0.0"), AddressRange::Public);
        // Alibaba Cloud metadata lives in shared address space
        assert_eq!(range("100.100.100.200"), AddressRange::CarrierGradeNat);
    }

    #[test]
    fn test_ipv6_ranges() {
        assert_eq!(range("::"), AddressRange::Unspecified);
        assert_eq!(range("::1"), AddressRange::Loopback);
        assert_eq!(range("0:0:0:0:0:0:0:1"), AddressRange::Loopback);
        assert_eq!(range("fc00::1"), AddressRange::UniqueLocal);
        assert_eq!(range("fdff:ffff:ffff:ffff:ffff:ffff:ffff:ffff"), AddressRange::UniqueLocal);
        assert_eq!(range("fd00:ec2::254"), AddressRange::UniqueLocal);
        assert_eq!(range("fe80::1"), AddressRange::LinkLocal);
        assert_eq!(range("febf::1"), AddressRange::LinkLocal);
        assert_eq!(range("fec0::1"), AddressRange::Public);
        assert_eq!(range("2001:4860:4860::8888"), AddressRange::Public);
    }

    #[test]
    fn test_ipv4_mapped_classification() {
        assert_eq!(range("::ffff:127.0.0.1"), AddressRange::Ipv4MappedIpv6);
        assert_eq!(range("::ffff:7f00:1"), AddressRange::Ipv4MappedIpv6);
        assert_eq!(range("::ffff:1.1.1.1"), AddressRange::Ipv4MappedIpv6);
        // deprecated compatible form
        assert_eq!(range("::127.0.0.1"), AddressRange::Ipv4MappedIpv6);
    }

    #[test]
    fn test_effective_range_unwraps_embedding() {
        assert_eq!(effective("::ffff:127.0.0.1"), AddressRange::Loopback);
        assert_eq!(effective("0:0:0:0:0:ffff:127.0.0.1"), AddressRange::Loopback);
        assert_eq!(effective("::ffff:10.0.0.1"), AddressRange::Private);
        assert_eq!(effective("::ffff:169.254.169.254"), AddressRange::LinkLocal);
        assert_eq!(effective("::169.254.169.254"), AddressRange::LinkLocal);
        assert_eq!(effective("::ffff:1.1.1.1"), AddressRange::Public);
        assert_eq!(effective("::1"), AddressRange::Loopback);
        assert_eq!(effective("10.0.0.1"), AddressRange::Private);
    }

    #[test]
    fn test_translation_prefixes_are_public() {
        assert_eq!(range("64:ff9b::7f00:1"), AddressRange::Public);
        assert_eq!(range("::ffff:0:7f00:1"), AddressRange::Public);
        assert_eq!(effective("64:ff9b::7f00:1"), AddressRange::Public);
    }

    #[test]
    fn test_embedded_ipv4_skips_unspecified_and_loopback() {
        assert_eq!(embedded_ipv4("::".parse().unwrap()), None);
        assert_eq!(embedded_ipv4("::1".parse().unwrap()), None);
        assert_eq!(embedded_ipv4("2001:db8::1".parse().unwrap()), None);
        assert_eq!(
            embedded_ipv4("::ffff:192.168.0.1".parse().unwrap()),
            Some(Ipv4Addr::new(192, 168, 0, 1))
        );
    }

    #[test]
    fn test_range_names() {
        assert_eq!(AddressRange::CarrierGradeNat.to_string(), "carrier-grade-nat");
        assert_eq!(
            serde_json::to_string(&AddressRange::Ipv4MappedIpv6).unwrap(),
            "\"ipv4-mapped-ipv6\""
        );
        assert!(AddressRange::Public.is_public());
        assert!(!AddressRange::UniqueLocal.is_public());
    }
}
