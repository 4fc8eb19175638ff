//! Session configuration
//!
//! Holds everything the session facade forwards to the engine at startup:
//! listen address, rate limits, directories and feature toggles. Loadable
//! from a TOML file; every field has a default so partial files are valid.

use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a [`crate::TorrentSession`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Interface the engine listens on
    pub listen_interfaces: String,

    /// Listen port for incoming peer connections
    pub port: u16,

    /// Client identification string
    pub user_agent: String,

    /// Download rate limit in KiB/s, 0 for unlimited, negative for 1 B/s
    pub download_rate_limit: i64,

    /// Upload rate limit in KiB/s, 0 for unlimited, negative for 1 B/s
    pub upload_rate_limit: i64,

    /// Directory for engine session state
    pub session_dir: PathBuf,

    /// Default directory for downloaded files
    pub output_dir: PathBuf,

    /// Disable the engine's DHT
    pub disable_dht: bool,

    /// Ask the engine to forward the listen port via UPnP
    pub enable_upnp: bool,

    /// Persist session state and resume data across restarts
    pub persistent: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            listen_interfaces: "0.0.0.0".to_string(),
            port: 6881,
            user_agent: concat!("rustorrent/", env!("CARGO_PKG_VERSION")).to_string(),
            download_rate_limit: 0,
            upload_rate_limit: 0,
            session_dir: PathBuf::from(".rustorrent"),
            output_dir: PathBuf::from("."),
            disable_dht: false,
            enable_upnp: true,
            persistent: true,
        }
    }
}

impl SessionConfig {
    /// Load a configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// Translate a KiB/s limit into the engine's bytes-per-second knob.
///
/// `0` disables the limit, a negative value clamps to the engine minimum of
/// one byte per second, anything else is `n * 1024`.
pub(crate) fn rate_limit_bps(kib_per_sec: i64) -> Option<NonZeroU32> {
    if kib_per_sec == 0 {
        None
    } else if kib_per_sec < 0 {
        NonZeroU32::new(1)
    } else {
        let bps = u32::try_from(kib_per_sec.saturating_mul(1024)).unwrap_or(u32::MAX);
        NonZeroU32::new(bps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.listen_interfaces, "0.0.0.0");
        assert_eq!(config.port, 6881);
        assert_eq!(config.download_rate_limit, 0);
        assert!(config.persistent);
    }

    #[test]
    fn test_rate_limit_mapping() {
        assert_eq!(rate_limit_bps(0), None);
        assert_eq!(rate_limit_bps(-1), NonZeroU32::new(1));
        assert_eq!(rate_limit_bps(64), NonZeroU32::new(64 * 1024));
        assert_eq!(rate_limit_bps(1), NonZeroU32::new(1024));
    }

    #[test]
    fn test_rate_limit_saturates() {
        // Values past u32::MAX bytes/s clamp instead of overflowing
        assert_eq!(rate_limit_bps(i64::MAX), NonZeroU32::new(u32::MAX));
    }

    #[test]
    fn test_partial_toml() {
        let config: SessionConfig = toml::from_str("port = 7000").unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.listen_interfaces, "0.0.0.0");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = 6900\ndownload_rate_limit = 512\n").unwrap();

        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.port, 6900);
        assert_eq!(config.download_rate_limit, 512);

        assert!(SessionConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
