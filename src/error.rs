//! Error types for fetchgate.

use std::net::IpAddr;
use thiserror::Error;

use crate::verdict::Reason;

/// Errors from configuration, address pinning and guarded fetching.
///
/// [`evaluate`](crate::evaluate) itself never fails; it returns a
/// [`Verdict`](crate::Verdict).
#[derive(Debug, Error)]
pub enum Error {
    /// The guard rejected the URL.
    #[error("URL rejected ({}): {reason}", .reason.code())]
    Unsafe { url: String, reason: Reason },

    /// The host resolved to an address that is not safe to connect to.
    #[error("SSRF blocked: {host} resolved to {ip} - {reason}")]
    SsrfBlocked {
        url: String,
        host: String,
        ip: IpAddr,
        reason: String,
    },

    /// DNS resolution failed.
    #[error("DNS error for {host}: {message}")]
    DnsError { host: String, message: String },

    /// Invalid guard configuration.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// A redirect pointed to a blocked URL.
    #[cfg(feature = "fetch")]
    #[error("Redirect blocked: {redirect_url} - {reason}")]
    RedirectBlocked {
        original_url: String,
        redirect_url: String,
        reason: String,
    },

    /// Too many redirects.
    #[cfg(feature = "fetch")]
    #[error("Too many redirects (max {max})")]
    TooManyRedirects { url: String, max: u8 },

    /// HTTP request failed.
    #[cfg(feature = "fetch")]
    #[error("HTTP error: {message}")]
    HttpError { url: String, message: String },
}

impl Error {
    /// The guard's rejection reason, when the URL itself was refused.
    pub fn reason(&self) -> Option<Reason> {
        match self {
            Self::Unsafe { reason, .. } => Some(*reason),
            Self::SsrfBlocked { .. } => Some(Reason::PrivateNetwork),
            _ => None,
        }
    }

    pub(crate) fn unsafe_url(url: impl Into<String>, reason: Reason) -> Self {
        Self::Unsafe {
            url: url.into(),
            reason,
        }
    }

    pub(crate) fn ssrf_blocked(
        url: impl Into<String>,
        host: impl Into<String>,
        ip: IpAddr,
        reason: impl Into<String>,
    ) -> Self {
        Self::SsrfBlocked {
            url: url.into(),
            host: host.into(),
            ip,
            reason: reason.into(),
        }
    }

    pub(crate) fn dns_error(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DnsError {
            host: host.into(),
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
