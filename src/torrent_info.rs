//! Torrent descriptor inspection
//!
//! Parses a .torrent file and reshapes it into plain records: aggregate
//! metadata plus ordered file and tracker collections. The records are
//! read-only snapshots of the descriptor; attributes the descriptor cannot
//! carry take documented defaults.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_bencode::value::Value;
use sha1::{Digest, Sha1};

/// A single file inside a torrent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// File name without leading directories
    pub file_name: String,
    /// Path relative to the torrent root
    pub path: String,
    /// File size in bytes
    pub size: u64,
    /// Byte offset of this file within the torrent payload
    pub offset: u64,
    /// Modification time as a unix timestamp, if the descriptor carries one
    pub mtime: Option<i64>,
    /// Executable attribute flag
    pub executable: bool,
    /// Hidden attribute flag
    pub hidden: bool,
    /// Pad file inserted for piece alignment
    pub pad_file: bool,
    /// Symlink attribute flag
    pub symlink: bool,
    /// Symlink target path, if the entry is a symlink
    pub symlink_path: Option<String>,
}

/// A tracker announce entry
///
/// Only `url` and `tier` can come from the descriptor itself; the failure
/// counters, scrape statistics and status flags exist on the engine's live
/// announce state and default to zero/empty/false here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerEntry {
    /// Announce URL
    pub url: String,
    /// Announce-list tier this URL belongs to
    pub tier: u32,
    /// Where the entry came from
    pub source: String,
    /// Tracker-assigned id from a previous announce
    pub trackerid: String,
    /// Last tracker status message
    pub message: String,
    /// Consecutive failed announces
    pub fails: u32,
    /// Failure count after which the tracker is abandoned, 0 for no limit
    pub fail_limit: u32,
    /// Whether the completed event has been sent
    pub complete_sent: bool,
    /// Earliest allowed re-announce, unix timestamp
    pub min_announce: i64,
    /// Scheduled next announce, unix timestamp
    pub next_announce: i64,
    /// Seeders reported by the last scrape
    pub scrape_complete: i64,
    /// Completed downloads reported by the last scrape
    pub scrape_downloaded: i64,
    /// Leechers reported by the last scrape
    pub scrape_incomplete: i64,
    /// Whether an announce is currently in flight
    pub updating: bool,
    /// Whether the tracker has responded successfully at least once
    pub verified: bool,
}

impl TrackerEntry {
    fn from_descriptor(url: String, tier: u32) -> Self {
        Self {
            url,
            tier,
            source: "torrent".to_string(),
            trackerid: String::new(),
            message: String::new(),
            fails: 0,
            fail_limit: 0,
            complete_sent: false,
            min_announce: 0,
            next_announce: 0,
            scrape_complete: 0,
            scrape_downloaded: 0,
            scrape_incomplete: 0,
            updating: false,
            verified: false,
        }
    }
}

/// Aggregate metadata of a torrent descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentInfo {
    /// Torrent name
    pub name: String,
    /// Free-form comment
    pub comment: Option<String>,
    /// Creation time as a unix timestamp
    pub creation_date: Option<i64>,
    /// Creating tool or author
    pub creator: Option<String>,
    /// Hex-encoded SHA-1 of the bencoded info dictionary
    pub info_hash: String,
    /// Piece size in bytes
    pub piece_length: i64,
    /// Number of pieces
    pub num_pieces: usize,
    /// Number of files
    pub num_files: usize,
    /// Total payload size in bytes, pad files included
    pub total_size: u64,
    /// Size of the bencoded info dictionary in bytes
    pub metadata_size: usize,
    /// Private torrent flag
    pub private: bool,
    /// Whether every tracker lives inside i2p
    pub is_i2p: bool,
    /// Whether the piece layout is consistent with the payload size
    pub is_valid: bool,
    /// Files in descriptor order
    pub files: Vec<FileEntry>,
    /// Trackers in tier order
    pub trackers: Vec<TrackerEntry>,
    /// DHT bootstrap nodes as (host, port) pairs
    pub nodes: Vec<(String, u16)>,
    /// Web seed URLs
    pub web_seeds: Vec<String>,
}

impl TorrentInfo {
    /// Parse a torrent descriptor file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)
            .with_context(|| format!("failed to read torrent file {}", path.display()))?;
        Self::from_bytes(&data)
            .with_context(|| format!("failed to parse torrent file {}", path.display()))
    }

    /// Parse raw torrent descriptor bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        // Generic pass first: the raw info dictionary bytes are needed for
        // the info-hash and the metadata size.
        let generic: Value =
            serde_bencode::from_bytes(data).context("descriptor is not valid bencode")?;
        let info_value = match generic {
            Value::Dict(mut dict) => dict
                .remove("info".as_bytes())
                .context("descriptor has no info dictionary")?,
            _ => anyhow::bail!("descriptor is not a bencoded dictionary"),
        };
        let info_bytes =
            serde_bencode::to_bytes(&info_value).context("failed to re-encode info dictionary")?;

        let raw: RawTorrent =
            serde_bencode::from_bytes(data).context("descriptor has an unexpected shape")?;

        let files = collect_files(&raw.info);
        let total_size: u64 = files.iter().map(|f| f.size).sum();
        let trackers = collect_trackers(&raw);
        let num_pieces = raw.info.pieces.len() / 20;

        let is_valid = raw.info.piece_length > 0
            && raw.info.pieces.len() % 20 == 0
            && (total_size == 0
                || total_size.div_ceil(raw.info.piece_length as u64) == num_pieces as u64);
        let is_i2p = !trackers.is_empty() && trackers.iter().all(|t| is_i2p_url(&t.url));

        let mut web_seeds = raw.url_list.unwrap_or_default();
        web_seeds.extend(raw.httpseeds.unwrap_or_default());

        Ok(Self {
            name: raw.info.name.clone(),
            comment: raw.comment,
            creation_date: raw.creation_date,
            creator: raw.created_by,
            info_hash: hex::encode(Sha1::digest(&info_bytes)),
            piece_length: raw.info.piece_length,
            num_pieces,
            num_files: files.len(),
            total_size,
            metadata_size: info_bytes.len(),
            private: raw.info.private.unwrap_or(0) != 0,
            is_i2p,
            is_valid,
            files,
            trackers,
            nodes: collect_nodes(raw.nodes.as_ref()),
            web_seeds,
        })
    }
}

impl fmt::Display for TorrentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "name: {}", self.name)?;
        writeln!(f, "comment: {}", self.comment.as_deref().unwrap_or(""))?;
        writeln!(f, "creator: {}", self.creator.as_deref().unwrap_or(""))?;
        writeln!(f, "creation date: {}", fmt_opt(self.creation_date))?;
        writeln!(f, "info hash: {}", self.info_hash)?;
        writeln!(f, "piece length: {}", self.piece_length)?;
        writeln!(f, "pieces: {}", self.num_pieces)?;
        writeln!(f, "total size: {}", self.total_size)?;
        writeln!(f, "metadata size: {}", self.metadata_size)?;
        writeln!(f, "private: {}", self.private)?;
        writeln!(f, "valid: {}", self.is_valid)?;
        writeln!(f, "files: {}", self.num_files)?;
        for file in &self.files {
            writeln!(f, "  {} ({} bytes at {})", file.path, file.size, file.offset)?;
        }
        writeln!(f, "trackers: {}", self.trackers.len())?;
        for tracker in &self.trackers {
            writeln!(f, "  tier {}: {}", tracker.tier, tracker.url)?;
        }
        if !self.nodes.is_empty() {
            writeln!(f, "nodes: {}", self.nodes.len())?;
            for (host, port) in &self.nodes {
                writeln!(f, "  {host}:{port}")?;
            }
        }
        if !self.web_seeds.is_empty() {
            writeln!(f, "web seeds: {}", self.web_seeds.len())?;
            for url in &self.web_seeds {
                writeln!(f, "  {url}")?;
            }
        }
        Ok(())
    }
}

fn fmt_opt(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn collect_files(info: &RawInfo) -> Vec<FileEntry> {
    match &info.files {
        // Multi-file: paths are relative to the torrent name, offsets are
        // cumulative in descriptor order.
        Some(raw_files) => {
            let mut offset = 0u64;
            raw_files
                .iter()
                .map(|raw| {
                    let size = raw.length.max(0) as u64;
                    let entry = file_entry(
                        &raw.path,
                        size,
                        offset,
                        raw.mtime,
                        raw.attr.as_deref(),
                        raw.symlink_path.as_deref(),
                    );
                    offset += size;
                    entry
                })
                .collect()
        }
        // Single-file: the torrent name is the file name.
        None => {
            let size = info.length.unwrap_or(0).max(0) as u64;
            vec![file_entry(
                std::slice::from_ref(&info.name),
                size,
                0,
                info.mtime,
                info.attr.as_deref(),
                info.symlink_path.as_deref(),
            )]
        }
    }
}

fn file_entry(
    path: &[String],
    size: u64,
    offset: u64,
    mtime: Option<i64>,
    attr: Option<&str>,
    symlink_path: Option<&[String]>,
) -> FileEntry {
    let attr = attr.unwrap_or("");
    FileEntry {
        file_name: path.last().cloned().unwrap_or_default(),
        path: path.join("/"),
        size,
        offset,
        mtime,
        executable: attr.contains('x'),
        hidden: attr.contains('h'),
        pad_file: attr.contains('p'),
        symlink: attr.contains('l'),
        symlink_path: symlink_path.map(|p| p.join("/")),
    }
}

fn collect_trackers(raw: &RawTorrent) -> Vec<TrackerEntry> {
    let mut trackers = Vec::new();
    match &raw.announce_list {
        Some(tiers) if !tiers.is_empty() => {
            for (tier, urls) in tiers.iter().enumerate() {
                for url in urls {
                    trackers.push(TrackerEntry::from_descriptor(url.clone(), tier as u32));
                }
            }
        }
        _ => {
            if let Some(announce) = &raw.announce {
                trackers.push(TrackerEntry::from_descriptor(announce.clone(), 0));
            }
        }
    }
    trackers
}

fn is_i2p_url(url: &str) -> bool {
    url.split('/')
        .nth(2)
        .map(|host| host.split(':').next().unwrap_or(host).ends_with(".i2p"))
        .unwrap_or(false)
}

// The nodes key is a list of [host, port] pairs.
fn collect_nodes(nodes: Option<&Value>) -> Vec<(String, u16)> {
    let Some(Value::List(entries)) = nodes else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let Value::List(pair) = entry else {
                return None;
            };
            match (pair.first(), pair.get(1)) {
                (Some(Value::Bytes(host)), Some(Value::Int(port))) => {
                    let host = String::from_utf8_lossy(host).into_owned();
                    u16::try_from(*port).ok().map(|port| (host, port))
                }
                _ => None,
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawTorrent {
    info: RawInfo,
    #[serde(default)]
    announce: Option<String>,
    #[serde(rename = "announce-list", default)]
    announce_list: Option<Vec<Vec<String>>>,
    #[serde(default)]
    nodes: Option<Value>,
    #[serde(rename = "url-list", default, deserialize_with = "string_or_list")]
    url_list: Option<Vec<String>>,
    #[serde(default, deserialize_with = "string_or_list")]
    httpseeds: Option<Vec<String>>,
    #[serde(rename = "creation date", default)]
    creation_date: Option<i64>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(rename = "created by", default)]
    created_by: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    name: String,
    #[serde(rename = "piece length", default)]
    piece_length: i64,
    #[serde(with = "serde_bytes", default)]
    pieces: Vec<u8>,
    #[serde(default)]
    length: Option<i64>,
    #[serde(default)]
    files: Option<Vec<RawFile>>,
    #[serde(default)]
    private: Option<i64>,
    #[serde(default)]
    mtime: Option<i64>,
    #[serde(default)]
    attr: Option<String>,
    #[serde(rename = "symlink path", default)]
    symlink_path: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawFile {
    length: i64,
    path: Vec<String>,
    #[serde(default)]
    mtime: Option<i64>,
    #[serde(default)]
    attr: Option<String>,
    #[serde(rename = "symlink path", default)]
    symlink_path: Option<Vec<String>>,
}

// Some descriptors carry url-list as a single string, others as a list.
fn string_or_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;
    match value {
        Value::Bytes(bytes) => {
            let url = String::from_utf8(bytes)
                .map_err(|e| de::Error::custom(format!("invalid UTF-8 in url list: {e}")))?;
            Ok(Some(vec![url]))
        }
        Value::List(items) => {
            let mut urls = Vec::new();
            for item in items {
                if let Value::Bytes(bytes) = item {
                    let url = String::from_utf8(bytes)
                        .map_err(|e| de::Error::custom(format!("invalid UTF-8 in url list: {e}")))?;
                    urls.push(url);
                }
            }
            Ok(Some(urls))
        }
        _ => Ok(None),
    }
}
