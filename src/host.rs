//! Host extraction and normalization.
//!
//! The WHATWG parser behind [`url::Url`] silently rewrites numeric hosts:
//! `127.1`, `0177.0.0.1`, `0x7f.0.0.1` and `2130706433` all come back as
//! `127.0.0.1`. To tell a strict literal from an obfuscated one we also look
//! at the host exactly as it was written in the input.

use std::net::IpAddr;

use url::Host;

/// What the host of a candidate URL turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HostKind {
    /// A strictly valid IPv4 or IPv6 literal.
    Ip(IpAddr),
    /// Numeric-looking, but not a strictly valid IP literal.
    Ambiguous,
    /// A domain name, normalized.
    Name(String),
}

/// Decide what kind of host `parsed` is, given the raw `input` it came from.
pub(crate) fn inspect(input: &str, parsed: Host<&str>) -> HostKind {
    let written = written_host(input).unwrap_or_default();

    if let Ok(ip) = written.parse::<IpAddr>() {
        // Both parsers must agree on the address
        return match parsed {
            Host::Ipv4(v4) if ip == IpAddr::V4(v4) => HostKind::Ip(ip),
            Host::Ipv6(v6) if ip == IpAddr::V6(v6) => HostKind::Ip(ip),
            _ => HostKind::Ambiguous,
        };
    }

    if looks_numeric(&written) {
        return HostKind::Ambiguous;
    }

    match parsed {
        // The URL parser saw an address where no strict literal was written:
        // hex, percent-encoded or otherwise reinterpreted.
        Host::Ipv4(_) | Host::Ipv6(_) => HostKind::Ambiguous,
        Host::Domain(domain) => HostKind::Name(normalize(domain)),
    }
}

/// Lowercase, strip trailing dots and IPv6 brackets.
pub(crate) fn normalize(host: &str) -> String {
    let lower = host.to_lowercase();
    let trimmed = lower.trim_end_matches('.');
    trimmed
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(trimmed)
        .to_string()
}

/// Digits, dots and the letter `x`, with at least one digit.
///
/// Catches short-form (`127.1`), octal-looking (`0177.0.0.1`), hex-looking
/// (`0x10.0.0.1`) and plain-integer (`2130706433`) encodings. Hex using the
/// letters `a`-`f` is caught by the parser check in [`inspect`] instead.
fn looks_numeric(host: &str) -> bool {
    host.bytes().any(|b| b.is_ascii_digit())
        && host
            .bytes()
            .all(|b| b.is_ascii_digit() || b == b'.' || b == b'x')
}

/// Pull the host out of the raw input, before any parser normalizes it.
///
/// Mirrors the parts of WHATWG authority splitting that matter for
/// `http`/`https`: surrounding control characters and embedded tabs/newlines
/// are dropped, any run of `/` or `\` after the scheme is skipped, and the
/// authority ends at the first `/`, `\`, `?` or `#`. Userinfo ends at the
/// last `@`.
fn written_host(input: &str) -> Option<String> {
    let cleaned: String = input
        .trim_matches(|c: char| c <= ' ')
        .chars()
        .filter(|c| !matches!(c, '\t' | '\n' | '\r'))
        .collect();

    let after_scheme = &cleaned[cleaned.find(':')? + 1..];
    let rest = after_scheme.trim_start_matches(['/', '\\']);

    let end = rest.find(['/', '\\', '?', '#']).unwrap_or(rest.len());
    let authority = &rest[..end];

    let host_with_port = authority
        .rfind('@')
        .map(|i| &authority[i + 1..])
        .unwrap_or(authority);

    // Be careful with IPv6 brackets when removing port
    let host = if host_with_port.starts_with('[') {
        host_with_port
            .find(']')
            .map(|i| &host_with_port[..=i])
            .unwrap_or(host_with_port)
    } else {
        host_with_port
            .rfind(':')
            .map(|i| &host_with_port[..i])
            .unwrap_or(host_with_port)
    };

    Some(normalize(host))
}
