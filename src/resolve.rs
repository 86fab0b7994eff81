//! Resolve-and-pin: close the gap between checking a URL and connecting.
//!
//! [`evaluate`](crate::evaluate) only sees the URL text. A name that passes
//! it can still resolve to `127.0.0.1`, and a second lookup at connect time
//! can return something different from the first. [`resolve_pinned`] looks
//! the name up once, checks every address it gets back, and hands the caller
//! the exact address to dial.

use std::net::{IpAddr, SocketAddr};

use hickory_resolver::TokioResolver;
use tracing::{trace, warn};
use url::{Host, Url};

use crate::error::Error;
use crate::guard::Guard;
use crate::verdict::Reason;

/// A URL that passed the guard, with the address it must be fetched from.
#[derive(Debug, Clone)]
pub struct Pinned {
    /// The verified IP address to connect to.
    pub ip: IpAddr,

    /// Original hostname (use for Host header / SNI).
    pub host: String,

    /// Port number.
    pub port: u16,

    /// Full URL (normalized).
    pub url: String,

    /// Whether HTTPS.
    pub https: bool,
}

impl Pinned {
    /// Get the socket address to connect to.
    pub fn to_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

/// Evaluate a URL, resolve its host once, and check every resolved address.
///
/// # Example
///
/// ```rust,no_run
/// use fetchgate::{resolve_pinned, Guard};
///
/// # async fn example() -> Result<(), fetchgate::Error> {
/// let pinned = resolve_pinned(&Guard::default(), "https://example.com/api").await?;
/// println!("Safe to connect to {} ({})", pinned.host, pinned.ip);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// - [`Error::Unsafe`] if the guard rejects the URL (no lookup is made)
/// - [`Error::DnsError`] if resolution fails or returns nothing
/// - [`Error::SsrfBlocked`] if any resolved address is blocked
pub async fn resolve_pinned(guard: &Guard, url: &str) -> Result<Pinned, Error> {
    guard
        .evaluate(url)
        .into_result()
        .map_err(|reason| Error::unsafe_url(url, reason))?;

    let parsed = Url::parse(url).map_err(|_| Error::unsafe_url(url, Reason::InvalidFormat))?;

    let (host, addrs) = match parsed.host() {
        Some(Host::Ipv4(v4)) => (v4.to_string(), vec![IpAddr::V4(v4)]),
        Some(Host::Ipv6(v6)) => (v6.to_string(), vec![IpAddr::V6(v6)]),
        Some(Host::Domain(domain)) => (domain.to_string(), lookup(domain).await?),
        None => return Err(Error::unsafe_url(url, Reason::InvalidFormat)),
    };

    let ip = check_resolved(guard, url, &host, &addrs)?;

    Ok(Pinned {
        ip,
        host,
        port: parsed.port_or_known_default().unwrap_or(80),
        url: parsed.to_string(),
        https: parsed.scheme() == "https",
    })
}

/// Synchronous version of [`resolve_pinned`].
///
/// This blocks the current thread while performing DNS resolution.
/// Works both inside a multi-threaded Tokio runtime and outside of any
/// runtime, in which case a temporary one is created.
///
/// # Panics
///
/// Panics if called from within a current-thread Tokio runtime (such as a
/// default `#[tokio::test]`), where `block_in_place` is not available.
pub fn resolve_pinned_sync(guard: &Guard, url: &str) -> Result<Pinned, Error> {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        tokio::task::block_in_place(|| handle.block_on(resolve_pinned(guard, url)))
    } else {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| Error::dns_error("runtime", e.to_string()))?;
        rt.block_on(resolve_pinned(guard, url))
    }
}

/// Check addresses returned for `host` and pick the one to connect to.
///
/// Every address must pass: a name with one public and one private record
/// is a rebinding setup, not a choice.
pub fn check_resolved(
    guard: &Guard,
    url: &str,
    host: &str,
    addrs: &[IpAddr],
) -> Result<IpAddr, Error> {
    let Some(&first) = addrs.first() else {
        return Err(Error::dns_error(host, "no IP addresses found"));
    };

    for &ip in addrs {
        if let Err(reason) = guard.check_ip(ip) {
            warn!(%host, %ip, %reason, "host resolved to a blocked address");
            return Err(Error::ssrf_blocked(url, host, ip, reason));
        }
    }

    trace!(%host, ip = %first, candidates = addrs.len(), "pinned address");
    Ok(first)
}

async fn lookup(host: &str) -> Result<Vec<IpAddr>, Error> {
    let resolver = TokioResolver::builder_tokio()
        .map_err(|e| Error::dns_error(host, e.to_string()))?
        .build();

    let response = resolver
        .lookup_ip(host)
        .await
        .map_err(|e| Error::dns_error(host, e.to_string()))?;

    Ok(response.iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::GuardBuilder;

    fn ips(list: &[&str]) -> Vec<IpAddr> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_pin_public_ip_literal() {
        let pinned = resolve_pinned(&Guard::default(), "https://1.1.1.1/dns-query")
            .await
            .unwrap();
        assert_eq!(pinned.ip, "1.1.1.1".parse::<IpAddr>().unwrap());
        assert_eq!(pinned.port, 443);
        assert!(pinned.https);
        assert_eq!(pinned.url, "https://1.1.1.1/dns-query");
        assert_eq!(pinned.to_socket_addr().to_string(), "1.1.1.1:443");
    }

    #[tokio::test]
    async fn test_pin_ipv6_literal_with_port() {
        let pinned = resolve_pinned(&Guard::default(), "http://[2001:4860:4860::8888]:8080/")
            .await
            .unwrap();
        assert_eq!(pinned.port, 8080);
        assert!(!pinned.https);
        assert_eq!(pinned.to_socket_addr().to_string(), "[2001:4860:4860::8888]:8080");
    }

    #[tokio::test]
    async fn test_block_loopback_before_lookup() {
        let err = resolve_pinned(&Guard::default(), "http://127.0.0.1/")
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(Reason::PrivateNetwork));
    }

    #[tokio::test]
    async fn test_block_localhost_before_lookup() {
        let err = resolve_pinned(&Guard::default(), "http://localhost:8080/")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Unsafe {
                reason: Reason::LocalhostOrLocalDomain,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_reject_octal() {
        let err = resolve_pinned(&Guard::default(), "http://0177.0.0.1/")
            .await
            .unwrap_err();
        assert_eq!(err.reason(), Some(Reason::AmbiguousIpFormat));
    }

    #[test]
    fn test_check_resolved_picks_first() {
        let addrs = ips(&["93.184.216.34", "2606:2800:220:1::1"]);
        let ip = check_resolved(&Guard::default(), "https://example.com/", "example.com", &addrs)
            .unwrap();
        assert_eq!(ip, addrs[0]);
    }

    #[test]
    fn test_check_resolved_rejects_any_private_record() {
        let addrs = ips(&["93.184.216.34", "10.0.0.1"]);
        let err = check_resolved(&Guard::default(), "http://rebind.test/", "rebind.test", &addrs)
            .unwrap_err();
        match err {
            Error::SsrfBlocked { ip, host, .. } => {
                assert_eq!(ip, addrs[1]);
                assert_eq!(host, "rebind.test");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_resolved_metadata_and_mapped() {
        let guard = Guard::default();
        for addr in ["169.254.169.254", "::ffff:127.0.0.1", "fd00:ec2::254", "100.100.100.200"] {
            let result = check_resolved(&guard, "http://x.test/", "x.test", &ips(&[addr]));
            assert!(matches!(result, Err(Error::SsrfBlocked { .. })), "{addr}");
        }
    }

    #[test]
    fn test_check_resolved_custom_cidr() {
        let guard = GuardBuilder::new().block_cidr("93.184.216.0/24").build().unwrap();
        let result = check_resolved(&guard, "https://example.com/", "example.com", &ips(&["93.184.216.34"]));
        assert!(matches!(result, Err(Error::SsrfBlocked { .. })));
    }

    #[test]
    fn test_check_resolved_empty() {
        let result = check_resolved(&Guard::default(), "https://example.com/", "example.com", &[]);
        assert!(matches!(result, Err(Error::DnsError { .. })));
    }

    #[test]
    fn test_sync_outside_runtime() {
        let pinned = resolve_pinned_sync(&Guard::default(), "http://8.8.8.8/").unwrap();
        assert_eq!(pinned.port, 80);

        let err = resolve_pinned_sync(&Guard::default(), "http://[::1]/").unwrap_err();
        assert_eq!(err.reason(), Some(Reason::PrivateNetwork));
    }
}
