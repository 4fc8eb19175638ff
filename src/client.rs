//! Minimal client composing the session and descriptor facades

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::SessionConfig;
use crate::session::{AddOptions, TorrentSession};
use crate::torrent_info::TorrentInfo;

/// A torrent client: one engine session plus descriptor inspection
pub struct TorrentClient {
    session: TorrentSession,
}

impl TorrentClient {
    /// Start a client with the given configuration
    pub async fn with_config(config: SessionConfig) -> Result<Self> {
        Ok(Self {
            session: TorrentSession::new(config).await?,
        })
    }

    /// The underlying session facade
    pub fn session(&self) -> &TorrentSession {
        &self.session
    }

    /// Inspect a descriptor file without a running session
    pub fn inspect(path: impl AsRef<Path>) -> Result<TorrentInfo> {
        TorrentInfo::from_file(path)
    }

    /// Add a descriptor file, magnet link or HTTP(S) URL and wait for the
    /// download to finish, logging a progress snapshot once a second.
    ///
    /// Returns the info-hash the engine registered the torrent under.
    pub async fn download(&self, source: &str, opts: AddOptions) -> Result<String> {
        let is_url = source.starts_with("magnet:")
            || source.starts_with("http://")
            || source.starts_with("https://");
        let info_hash = if is_url {
            self.session.add_magnet(source, opts).await?
        } else {
            self.session.add_torrent_file(source, opts).await?
        };
        self.wait_logging_progress(&info_hash).await?;
        Ok(info_hash)
    }

    async fn wait_logging_progress(&self, info_hash: &str) -> Result<()> {
        let wait = self.session.wait_until_completed(info_hash);
        tokio::pin!(wait);
        let mut ticker = tokio::time::interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                result = &mut wait => return result,
                _ = ticker.tick() => match self.session.progress(info_hash).await {
                    Ok(progress) => info!(
                        state = %progress.state,
                        percent = progress.progress_fraction() * 100.0,
                        peers = progress.peers_live,
                        down = progress.download_speed.as_deref().unwrap_or("-"),
                        "downloading"
                    ),
                    Err(error) => warn!(%info_hash, "progress poll failed: {error:#}"),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal single-file descriptor, info keys in bencode order
    const DESCRIPTOR: &[u8] =
        b"d4:infod6:lengthi100e4:name1:f12:piece lengthi100e6:pieces20:AAAAAAAAAAAAAAAAAAAAee";

    #[test]
    fn test_inspect_reads_descriptor_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.torrent");
        std::fs::write(&path, DESCRIPTOR).unwrap();

        let info = TorrentClient::inspect(&path).unwrap();
        assert_eq!(info.name, "f");
        assert_eq!(info.total_size, 100);
        assert_eq!(info.num_pieces, 1);
        assert!(info.is_valid);
    }

    #[test]
    fn test_inspect_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TorrentClient::inspect(dir.path().join("missing.torrent")).is_err());
    }
}
