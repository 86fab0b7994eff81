//! Guard configuration loaded from TOML.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::guard::{Guard, GuardBuilder};

/// Extra blocking rules, usually kept in a `fetchgate.toml`.
///
/// ```toml
/// block_cloud_metadata = true
/// blocked_hosts = ["*.corp.example", "intranet"]
/// blocked_cidrs = ["203.0.113.0/24", "2001:db8::/32"]
/// ```
///
/// Every field is optional; an empty file yields the built-in rules only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuardConfig {
    /// Block `metadata.google.internal` and the other cloud metadata names.
    pub block_cloud_metadata: bool,
    /// Host names or `*.suffix` patterns to reject.
    pub blocked_hosts: Vec<String>,
    /// Networks in CIDR notation to reject.
    pub blocked_cidrs: Vec<String>,
}

impl GuardConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(data: &str) -> Result<Self, Error> {
        toml::from_str(data).map_err(|e| Error::config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        let cfg = Self::from_toml_str(&data)?;
        tracing::debug!(
            path = %path.display(),
            hosts = cfg.blocked_hosts.len(),
            cidrs = cfg.blocked_cidrs.len(),
            "loaded guard config"
        );
        Ok(cfg)
    }

    /// Build the guard these rules describe.
    pub fn build(&self) -> Result<Guard, Error> {
        let mut builder = GuardBuilder::new();
        if self.block_cloud_metadata {
            builder = builder.block_cloud_metadata_hosts();
        }
        for host in &self.blocked_hosts {
            builder = builder.block_host(host);
        }
        for cidr in &self.blocked_cidrs {
            builder = builder.block_cidr(cidr);
        }
        builder.build()
    }
}
