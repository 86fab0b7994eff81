//! Guard outcomes.

use std::fmt;

use serde::Serialize;

/// Why a URL was judged unsafe to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// The URL could not be parsed.
    InvalidFormat,
    /// Scheme other than `http` or `https`.
    DisallowedScheme,
    /// `localhost`, a `.local` name, or a blocked host name.
    LocalhostOrLocalDomain,
    /// A literal IP address outside public address space.
    PrivateNetwork,
    /// Host looks numeric but is not a strictly valid IP literal.
    AmbiguousIpFormat,
}

impl Reason {
    /// Stable machine-readable code, safe to return to clients.
    pub fn code(self) -> &'static str {
        match self {
            Reason::InvalidFormat => "invalid_format",
            Reason::DisallowedScheme => "disallowed_scheme",
            Reason::LocalhostOrLocalDomain => "localhost_or_local_domain",
            Reason::PrivateNetwork => "private_network",
            Reason::AmbiguousIpFormat => "ambiguous_ip_format",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Reason::InvalidFormat => "URL could not be parsed",
            Reason::DisallowedScheme => "only http and https URLs may be fetched",
            Reason::LocalhostOrLocalDomain => "host refers to the local machine or an internal domain",
            Reason::PrivateNetwork => "address is in a private or reserved network range",
            Reason::AmbiguousIpFormat => "host uses a non-standard IP address notation",
        };
        f.write_str(msg)
    }
}

/// Result of evaluating a candidate URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Safe,
    Unsafe(Reason),
}

impl Verdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, Verdict::Safe)
    }

    /// The rejection reason, if any.
    pub fn reason(&self) -> Option<Reason> {
        match self {
            Verdict::Safe => None,
            Verdict::Unsafe(reason) => Some(*reason),
        }
    }

    /// Convert into a `Result` so callers can use `?`.
    pub fn into_result(self) -> Result<(), Reason> {
        match self {
            Verdict::Safe => Ok(()),
            Verdict::Unsafe(reason) => Err(reason),
        }
    }
}
