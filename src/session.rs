//! Torrent session management over librqbit
//!
//! `TorrentSession` holds the configuration and forwards every operational
//! call to one underlying engine session. All protocol work, scheduling and
//! disk I/O happen inside the engine; this layer only translates the
//! configuration, keeps the info-hash registry and reshapes stats into
//! plain records.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use librqbit::api::TorrentIdOrHash;
use librqbit::{
    AddTorrent, AddTorrentOptions, ManagedTorrent, Session, SessionOptions,
    SessionPersistenceConfig,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::{rate_limit_bps, SessionConfig};
use crate::progress::DownloadProgress;

/// Per-add options forwarded to the engine
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Directory for the downloaded files, session default when unset
    pub output_dir: Option<PathBuf>,
    /// Indices of the files to download, all files when unset
    pub only_files: Option<Vec<usize>>,
    /// Add the torrent paused
    pub paused: bool,
    /// Overwrite files already present in the output directory
    pub overwrite: bool,
}

/// Session facade over one engine session
pub struct TorrentSession {
    session: Arc<Session>,
    config: SessionConfig,
    torrents: RwLock<HashMap<String, Arc<ManagedTorrent>>>,
}

impl TorrentSession {
    /// Start an engine session configured from `config`
    pub async fn new(config: SessionConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.output_dir).with_context(|| {
            format!("failed to create output directory {}", config.output_dir.display())
        })?;
        std::fs::create_dir_all(&config.session_dir).with_context(|| {
            format!("failed to create session directory {}", config.session_dir.display())
        })?;

        let session = Session::new_with_opts(config.output_dir.clone(), engine_options(&config))
            .await
            .context("failed to start engine session")?;

        info!(
            port = config.port,
            dht = !config.disable_dht,
            persistent = config.persistent,
            "session started"
        );

        Ok(Self {
            session,
            config,
            torrents: RwLock::new(HashMap::new()),
        })
    }

    /// The configuration this session was started with
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Configured download rate limit in KiB/s, 0 for unlimited
    pub fn download_rate_limit(&self) -> i64 {
        self.config.download_rate_limit
    }

    /// Configured upload rate limit in KiB/s, 0 for unlimited
    pub fn upload_rate_limit(&self) -> i64 {
        self.config.upload_rate_limit
    }

    /// Add a torrent from a descriptor file on disk
    pub async fn add_torrent_file(
        &self,
        path: impl AsRef<Path>,
        opts: AddOptions,
    ) -> Result<String> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read torrent file {}", path.display()))?;
        self.add(AddTorrent::from_bytes(data), opts).await
    }

    /// Add a torrent from raw descriptor bytes
    pub async fn add_torrent_bytes(&self, data: Vec<u8>, opts: AddOptions) -> Result<String> {
        self.add(AddTorrent::from_bytes(data), opts).await
    }

    /// Add a torrent from a magnet link or HTTP(S) URL
    pub async fn add_magnet(&self, url: &str, opts: AddOptions) -> Result<String> {
        self.add(AddTorrent::from_url(url), opts).await
    }

    async fn add(&self, torrent: AddTorrent<'_>, opts: AddOptions) -> Result<String> {
        let response = self
            .session
            .add_torrent(torrent, Some(engine_add_options(opts)))
            .await
            .context("engine rejected torrent")?;
        let handle = response
            .into_handle()
            .context("engine returned no torrent handle")?;

        let info_hash = handle.info_hash().as_string();
        self.torrents.write().await.insert(info_hash.clone(), handle);
        info!(%info_hash, "torrent added");
        Ok(info_hash)
    }

    /// Snapshot the engine's stats for a torrent
    pub async fn progress(&self, info_hash: &str) -> Result<DownloadProgress> {
        let handle = self.handle(info_hash).await?;
        Ok(DownloadProgress::from_stats(&handle.stats()))
    }

    /// Block until the torrent finishes downloading
    pub async fn wait_until_completed(&self, info_hash: &str) -> Result<()> {
        let handle = self.handle(info_hash).await?;
        handle.wait_until_completed().await?;
        info!(%info_hash, "download completed");
        Ok(())
    }

    /// Pause a torrent
    pub async fn pause(&self, info_hash: &str) -> Result<()> {
        let handle = self.handle(info_hash).await?;
        self.session
            .pause(&handle)
            .await
            .context("engine failed to pause torrent")?;
        debug!(%info_hash, "torrent paused");
        Ok(())
    }

    /// Resume a paused torrent
    pub async fn resume(&self, info_hash: &str) -> Result<()> {
        let handle = self.handle(info_hash).await?;
        self.session
            .unpause(&handle)
            .await
            .context("engine failed to resume torrent")?;
        debug!(%info_hash, "torrent resumed");
        Ok(())
    }

    /// Forget a torrent, optionally deleting its files
    pub async fn remove_torrent(&self, info_hash: &str, delete_files: bool) -> Result<()> {
        let handle = self
            .torrents
            .write()
            .await
            .remove(info_hash)
            .with_context(|| format!("torrent {info_hash} is not registered in this session"))?;
        self.session
            .delete(TorrentIdOrHash::Hash(handle.info_hash()), delete_files)
            .await
            .context("engine failed to remove torrent")?;
        info!(%info_hash, delete_files, "torrent removed");
        Ok(())
    }

    /// Info-hashes of the torrents registered in this session
    pub async fn list_torrents(&self) -> Vec<String> {
        self.torrents.read().await.keys().cloned().collect()
    }

    /// Gracefully shut the engine session down
    pub async fn stop(&self) {
        info!("stopping session");
        self.session.stop().await;
    }

    async fn handle(&self, info_hash: &str) -> Result<Arc<ManagedTorrent>> {
        self.torrents
            .read()
            .await
            .get(info_hash)
            .cloned()
            .with_context(|| format!("torrent {info_hash} is not registered in this session"))
    }
}

fn engine_add_options(opts: AddOptions) -> AddTorrentOptions {
    AddTorrentOptions {
        paused: opts.paused,
        overwrite: opts.overwrite,
        only_files: opts.only_files,
        output_folder: opts.output_dir.map(|p| p.to_string_lossy().into_owned()),
        ..Default::default()
    }
}

// Translation of the facade configuration into engine options. The listen
// interface string and user agent stay on the config; the engine does not
// expose knobs for them.
fn engine_options(config: &SessionConfig) -> SessionOptions {
    let mut opts = SessionOptions {
        disable_dht: config.disable_dht,
        disable_dht_persistence: config.disable_dht || !config.persistent,
        fastresume: config.persistent,
        enable_upnp_port_forwarding: config.enable_upnp,
        listen_port_range: Some(config.port..config.port.saturating_add(1)),
        ..Default::default()
    };
    if config.persistent {
        opts.persistence = Some(SessionPersistenceConfig::Json {
            folder: Some(config.session_dir.join("session")),
        });
    }
    opts.ratelimits.download_bps = rate_limit_bps(config.download_rate_limit);
    opts.ratelimits.upload_bps = rate_limit_bps(config.upload_rate_limit);
    opts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    #[test]
    fn test_engine_options_mirror_config() {
        let config = SessionConfig {
            port: 7001,
            disable_dht: true,
            enable_upnp: false,
            persistent: false,
            download_rate_limit: 256,
            upload_rate_limit: 0,
            ..SessionConfig::default()
        };

        let opts = engine_options(&config);
        assert!(opts.disable_dht);
        assert!(opts.disable_dht_persistence);
        assert!(!opts.enable_upnp_port_forwarding);
        assert!(!opts.fastresume);
        assert!(opts.persistence.is_none());
        assert_eq!(opts.listen_port_range, Some(7001..7002));
        assert_eq!(opts.ratelimits.download_bps, NonZeroU32::new(256 * 1024));
        assert_eq!(opts.ratelimits.upload_bps, None);
    }

    #[test]
    fn test_engine_options_persistence() {
        let config = SessionConfig {
            persistent: true,
            ..SessionConfig::default()
        };

        let opts = engine_options(&config);
        assert!(opts.fastresume);
        assert!(opts.persistence.is_some());
        assert!(!opts.disable_dht_persistence);
    }

    #[test]
    fn test_add_options_defaults() {
        let opts = AddOptions::default();
        assert!(opts.output_dir.is_none());
        assert!(opts.only_files.is_none());
        assert!(!opts.paused);
        assert!(!opts.overwrite);
    }

    #[test]
    fn test_add_options_forwarded_unchanged() {
        let opts = engine_add_options(AddOptions {
            output_dir: Some(PathBuf::from("/tmp/out")),
            only_files: Some(vec![0, 2]),
            paused: true,
            overwrite: true,
        });
        assert!(opts.paused);
        assert!(opts.overwrite);
        assert_eq!(opts.only_files, Some(vec![0, 2]));
        assert_eq!(opts.output_folder.as_deref(), Some("/tmp/out"));
    }
}
