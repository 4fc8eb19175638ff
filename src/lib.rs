//! Thin torrent client facade over the librqbit engine
//!
//! This crate provides:
//! - Torrent session management forwarded to the engine
//! - Descriptor inspection as plain metadata records
//! - A minimal client composing the two
//!
//! The engine owns the wire protocol, piece scheduling, disk I/O, DHT and
//! peer management; nothing here reimplements protocol logic.

pub mod client;
pub mod config;
pub mod progress;
pub mod session;
pub mod torrent_info;

pub use client::TorrentClient;
pub use config::SessionConfig;
pub use progress::DownloadProgress;
pub use session::{AddOptions, TorrentSession};
pub use torrent_info::{FileEntry, TorrentInfo, TrackerEntry};
