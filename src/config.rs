//! The runtime configuration a [`crate::session::Session`] is built from,
//! merging CLI flags over an optional TOML file — the same split the
//! teacher's `config.rs`/`defaults.rs` pair uses, minus the per-account
//! database bookkeeping this crate has no use for.

use serde::Deserialize;

use crate::wire::Proto;

/// Fully resolved configuration for one run of the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub proto: Proto,
    pub name: String,
    pub target_address: String,
    pub address: String,
    pub with_metrics: bool,
    pub target_tls: bool,
}

/// The subset of configuration that may come from a TOML file on disk.
/// Every field is optional: CLI flags always take precedence, and the file
/// itself is entirely optional convenience, never required input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub struct FileConfig {
    pub address: Option<String>,
    pub metrics: Option<bool>,
}

impl FileConfig {
    /// Load the optional config file, treating "file does not exist" as an
    /// empty configuration rather than an error — nothing in it is
    /// mandatory.
    pub async fn load(path: &std::path::Path) -> Result<FileConfig, anyhow::Error> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Apply CLI overrides, where `Some` always wins over the file's value.
    pub fn merge(self, address: Option<String>, metrics: bool) -> (String, bool) {
        (
            address.or(self.address).unwrap_or_else(|| crate::defaults::ADDRESS.to_string()),
            metrics || self.metrics.unwrap_or(false),
        )
    }
}
