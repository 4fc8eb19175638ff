//! Download progress records
//!
//! Plain snapshots of the engine's per-torrent stats. The engine exposes a
//! polling accessor rather than an alert queue; these records are what the
//! session facade hands back on each poll.

use librqbit::TorrentStats;
use serde::{Deserialize, Serialize};

/// Progress snapshot for a torrent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// Engine-reported torrent state
    pub state: String,
    /// Bytes downloaded and checked so far
    pub downloaded_bytes: u64,
    /// Bytes uploaded to peers
    pub uploaded_bytes: u64,
    /// Total payload size
    pub total_bytes: u64,
    /// Downloaded bytes per file, in descriptor order
    pub file_progress: Vec<u64>,
    /// Human-readable download speed, present while the torrent is live
    pub download_speed: Option<String>,
    /// Human-readable upload speed, present while the torrent is live
    pub upload_speed: Option<String>,
    /// Connected peers
    pub peers_live: u64,
    /// Peers discovered so far
    pub peers_seen: u64,
    /// Whether the download has completed
    pub finished: bool,
    /// Engine-reported error, if the torrent is in an error state
    pub error: Option<String>,
}

impl DownloadProgress {
    pub(crate) fn from_stats(stats: &TorrentStats) -> Self {
        let (download_speed, upload_speed, peers_live, peers_seen) = match &stats.live {
            Some(live) => (
                Some(live.download_speed.to_string()),
                Some(live.upload_speed.to_string()),
                live.snapshot.peer_stats.live as u64,
                live.snapshot.peer_stats.seen as u64,
            ),
            None => (None, None, 0, 0),
        };

        Self {
            state: format!("{:?}", stats.state).to_ascii_lowercase(),
            downloaded_bytes: stats.progress_bytes,
            uploaded_bytes: stats.uploaded_bytes,
            total_bytes: stats.total_bytes,
            file_progress: stats.file_progress.clone(),
            download_speed,
            upload_speed,
            peers_live,
            peers_seen,
            finished: stats.finished,
            error: stats.error.clone(),
        }
    }

    /// Completed fraction in `0.0..=1.0`
    #[inline]
    pub fn progress_fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            self.downloaded_bytes as f64 / self.total_bytes as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(downloaded: u64, total: u64) -> DownloadProgress {
        DownloadProgress {
            state: "live".to_string(),
            downloaded_bytes: downloaded,
            uploaded_bytes: 0,
            total_bytes: total,
            file_progress: Vec::new(),
            download_speed: None,
            upload_speed: None,
            peers_live: 0,
            peers_seen: 0,
            finished: false,
            error: None,
        }
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(snapshot(0, 0).progress_fraction(), 0.0);
        assert_eq!(snapshot(0, 100).progress_fraction(), 0.0);
        assert_eq!(snapshot(50, 100).progress_fraction(), 0.5);
        assert_eq!(snapshot(100, 100).progress_fraction(), 1.0);
    }
}
