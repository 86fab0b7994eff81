//! # fetchgate
//!
//! SSRF gate for servers that fetch user-supplied URLs.
//!
//! `fetchgate` decides whether a URL is safe for the server to request on a
//! user's behalf. The core check, [`evaluate`], is a pure function over the URL
//! text: it rejects non-HTTP schemes, local names, private and reserved IP
//! literals, and any numeric host written in a form other than a strict IPv4
//! or IPv6 literal (`127.1`, `0177.0.0.1`, `0x7f000001`, ...). When in doubt it
//! says no.
//!
//! ## Quick Start
//!
//! ```rust
//! use fetchgate::{evaluate, Reason, Verdict};
//!
//! assert_eq!(evaluate("https://example.com/api"), Verdict::Safe);
//! assert_eq!(evaluate("http://[::ffff:127.0.0.1]/"), Verdict::Unsafe(Reason::PrivateNetwork));
//!
//! if let Verdict::Unsafe(reason) = evaluate("http://localhost:6379/") {
//!     // surface as a 400 to the caller; never issue the request
//!     println!("refused: {} ({})", reason, reason.code());
//! }
//! ```
//!
//! [`evaluate`] does not resolve DNS. To also pin the address a name resolves
//! to, use [`resolve_pinned`] and connect to [`Pinned::ip`].

mod config;
mod error;
mod guard;
mod host;
mod range;
mod resolve;
mod verdict;

#[cfg(feature = "fetch")]
mod fetch;

pub use config::GuardConfig;
pub use error::Error;
pub use guard::{evaluate, Guard, GuardBuilder};
pub use range::{classify, effective_range, embedded_ipv4, AddressRange};
pub use resolve::{check_resolved, resolve_pinned, resolve_pinned_sync, Pinned};
pub use verdict::{Reason, Verdict};

#[cfg(feature = "fetch")]
pub use fetch::{fetch, fetch_sync, FetchResult};
