//! Constants shared across the crate.

use std::time::Duration;

/// The rendezvous server dialed when `--address` is not given.
pub const ADDRESS: &str = "wormhole.dyastin.dev:443";

/// How long a forwarder waits to dial the local target before giving up.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

pub mod config {
    use directories::ProjectDirs;

    const ORGANIZATION: &str = "";
    const APPLICATION: &str = "wormhole";
    pub const CONFIG_FILE: &str = "wormhole.toml";

    pub fn config_path() -> Option<std::path::PathBuf> {
        Some(
            ProjectDirs::from("", ORGANIZATION, APPLICATION)?
                .config_dir()
                .join(CONFIG_FILE),
        )
    }
}
