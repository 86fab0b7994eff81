//! The SSRF guard.
//!
//! A [`Guard`] decides, for a single URL string, whether issuing an outbound
//! request to it is safe. It works purely on the URL text: no DNS, no I/O, no
//! shared state. Anything it cannot confidently classify as a public address
//! or a non-local name is rejected.
//!
//! ## Extra rules
//!
//! [`GuardBuilder`] adds host and network rules on top of the built-in ones.
//! Rules can only block; nothing overrides a built-in rejection.
//!
//! ```rust
//! use fetchgate::{GuardBuilder, Reason, Verdict};
//!
//! let guard = GuardBuilder::new()
//!     .block_cloud_metadata_hosts()
//!     .block_host("*.corp.example")
//!     .block_cidr("203.0.113.0/24")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(
//!     guard.evaluate("http://metadata.google.internal/computeMetadata/v1/"),
//!     Verdict::Unsafe(Reason::LocalhostOrLocalDomain)
//! );
//! assert_eq!(
//!     guard.evaluate("http://203.0.113.7/"),
//!     Verdict::Unsafe(Reason::PrivateNetwork)
//! );
//! ```

use std::net::IpAddr;

use ipnet::IpNet;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::host::{self, HostKind};
use crate::range::{effective_range, embedded_ipv4};
use crate::verdict::{Reason, Verdict};

/// Cloud instance-metadata host names (matched with their subdomains).
const CLOUD_METADATA_HOSTS: &[&str] = &[
    "metadata.google.internal",
    "metadata.goog",
    "metadata.azure.internal",
    "instance-data", // AWS alternate (EC2-Classic)
];

static BASELINE: Guard = Guard::new();

/// Evaluate a URL with the built-in rules only.
///
/// # Example
///
/// ```rust
/// use fetchgate::{evaluate, Reason, Verdict};
///
/// assert_eq!(evaluate("https://example.com/api"), Verdict::Safe);
/// assert_eq!(
///     evaluate("http://169.254.169.254/latest/meta-data/"),
///     Verdict::Unsafe(Reason::PrivateNetwork)
/// );
/// assert_eq!(evaluate("http://127.1/"), Verdict::Unsafe(Reason::AmbiguousIpFormat));
/// ```
pub fn evaluate(url: &str) -> Verdict {
    BASELINE.evaluate(url)
}

/// An immutable set of SSRF rules.
///
/// `Guard::default()` applies only the built-in rules and behaves exactly
/// like [`evaluate`].
#[derive(Debug, Clone, Default)]
pub struct Guard {
    blocked_hosts: Vec<String>,
    blocked_cidrs: Vec<IpNet>,
}

impl Guard {
    /// A guard with the built-in rules only.
    pub const fn new() -> Self {
        Self {
            blocked_hosts: Vec::new(),
            blocked_cidrs: Vec::new(),
        }
    }

    /// Decide whether `url` is safe to fetch.
    ///
    /// Rules, first match wins:
    /// 1. unparseable → [`Reason::InvalidFormat`]
    /// 2. scheme other than http/https → [`Reason::DisallowedScheme`]
    /// 3. `localhost`, `*.local` or a blocked host → [`Reason::LocalhostOrLocalDomain`]
    /// 4. strict IP literal outside public space, or in a blocked network →
    ///    [`Reason::PrivateNetwork`]
    /// 5. numeric-looking host that is not a strict IP literal →
    ///    [`Reason::AmbiguousIpFormat`]
    /// 6. otherwise [`Verdict::Safe`]
    pub fn evaluate(&self, url: &str) -> Verdict {
        let verdict = self.judge(url);
        if let Verdict::Unsafe(reason) = verdict {
            debug!(reason = reason.code(), "rejected outbound URL");
        }
        verdict
    }

    fn judge(&self, input: &str) -> Verdict {
        let Ok(url) = Url::parse(input) else {
            return Verdict::Unsafe(Reason::InvalidFormat);
        };

        if !matches!(url.scheme(), "http" | "https") {
            return Verdict::Unsafe(Reason::DisallowedScheme);
        }

        let Some(parsed) = url.host() else {
            return Verdict::Unsafe(Reason::InvalidFormat);
        };

        match host::inspect(input, parsed) {
            HostKind::Name(name) => match self.check_host(&name) {
                Ok(()) => Verdict::Safe,
                Err(why) => {
                    debug!(host = %name, %why, "host name blocked");
                    Verdict::Unsafe(Reason::LocalhostOrLocalDomain)
                }
            },
            HostKind::Ip(ip) => match self.check_ip(ip) {
                Ok(()) => Verdict::Safe,
                Err(why) => {
                    debug!(%ip, %why, "address blocked");
                    Verdict::Unsafe(Reason::PrivateNetwork)
                }
            },
            HostKind::Ambiguous => Verdict::Unsafe(Reason::AmbiguousIpFormat),
        }
    }

    /// Check a normalized host name.
    ///
    /// Returns `Ok(())` if allowed, `Err(reason)` if blocked.
    pub fn check_host(&self, host: &str) -> Result<(), String> {
        let host = host::normalize(host);

        if host == "localhost" || host.ends_with(".local") {
            return Err(format!("{host} is a local name"));
        }

        for pattern in &self.blocked_hosts {
            if matches_hostname_pattern(&host, pattern) {
                return Err(format!("blocked by hostname rule: {pattern}"));
            }
        }

        Ok(())
    }

    /// Check an IP address, looking through IPv4-mapped IPv6.
    ///
    /// Returns `Ok(())` if allowed, `Err(reason)` if blocked.
    pub fn check_ip(&self, ip: IpAddr) -> Result<(), String> {
        let range = effective_range(ip);
        if !range.is_public() {
            return Err(format!("{range} address"));
        }

        let embedded = match ip {
            IpAddr::V6(v6) => embedded_ipv4(v6).map(IpAddr::V4),
            IpAddr::V4(_) => None,
        };
        for cidr in &self.blocked_cidrs {
            if cidr.contains(&ip) || embedded.is_some_and(|v4| cidr.contains(&v4)) {
                return Err(format!("blocked by network rule: {cidr}"));
            }
        }

        Ok(())
    }
}

/// Builder for a [`Guard`] with extra blocking rules.
#[derive(Debug, Clone, Default)]
pub struct GuardBuilder {
    blocked_hosts: Vec<String>,
    blocked_cidrs: Vec<IpNet>,
    invalid_cidrs: Vec<String>,
}

impl GuardBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block a hostname or pattern.
    ///
    /// Supports wildcards: `*.internal.example.com` matches the name itself
    /// and every subdomain.
    pub fn block_host(mut self, pattern: &str) -> Self {
        self.blocked_hosts.push(host::normalize(pattern));
        self
    }

    /// Block the well-known cloud instance-metadata host names.
    pub fn block_cloud_metadata_hosts(mut self) -> Self {
        for host in CLOUD_METADATA_HOSTS {
            self.blocked_hosts.push(format!("*.{host}"));
        }
        self
    }

    /// Block an IP range (CIDR notation).
    ///
    /// An unparseable range makes [`build`](Self::build) fail.
    pub fn block_cidr(mut self, cidr: &str) -> Self {
        match cidr.trim().parse::<IpNet>() {
            Ok(net) => self.blocked_cidrs.push(net),
            Err(_) => self.invalid_cidrs.push(cidr.to_string()),
        }
        self
    }

    /// Block an already-parsed IP range.
    pub fn block_network(mut self, net: IpNet) -> Self {
        self.blocked_cidrs.push(net);
        self
    }

    /// Build the guard.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any CIDR passed to
    /// [`block_cidr`](Self::block_cidr) did not parse.
    pub fn build(self) -> Result<Guard, Error> {
        if let Some(bad) = self.invalid_cidrs.first() {
            return Err(Error::config(format!("invalid CIDR '{bad}'")));
        }
        Ok(Guard {
            blocked_hosts: self.blocked_hosts,
            blocked_cidrs: self.blocked_cidrs,
        })
    }
}

/// Match a hostname against a pattern (supports * wildcard).
fn matches_hostname_pattern(host: &str, pattern: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => host == base || host.ends_with(&pattern[1..]),
        None => host == pattern,
    }
}
