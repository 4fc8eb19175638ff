use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rustorrent::{AddOptions, SessionConfig, TorrentClient, TorrentInfo};

#[derive(Parser, Debug)]
#[command(
    name = "rustorrent",
    version,
    about = "Torrent client built on the librqbit engine",
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Listen port for incoming peer connections
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Download rate limit in KiB/s, 0 for unlimited
    #[arg(long, global = true)]
    download_limit: Option<i64>,

    /// Upload rate limit in KiB/s, 0 for unlimited
    #[arg(long, global = true)]
    upload_limit: Option<i64>,

    /// Directory for session state
    #[arg(long, global = true)]
    session_dir: Option<PathBuf>,

    /// Disable the engine's DHT
    #[arg(long, global = true)]
    disable_dht: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect a torrent descriptor file
    Info {
        /// Path to the .torrent file
        torrent: PathBuf,

        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Download a torrent to completion
    Download {
        /// Path to a .torrent file, or a magnet/HTTP link
        source: String,

        /// Output directory for downloaded files
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Comma-separated indices of the files to download
        #[arg(long, value_delimiter = ',')]
        files: Option<Vec<usize>>,

        /// Overwrite files already present in the output directory
        #[arg(long)]
        overwrite: bool,
    },
}

impl Cli {
    fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)?,
            None => SessionConfig::default(),
        };
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(limit) = self.download_limit {
            config.download_rate_limit = limit;
        }
        if let Some(limit) = self.upload_limit {
            config.upload_rate_limit = limit;
        }
        if let Some(dir) = &self.session_dir {
            config.session_dir = dir.clone();
        }
        if self.disable_dht {
            config.disable_dht = true;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.session_config()?;

    match cli.command {
        Commands::Info { torrent, json } => {
            let torrent_info = TorrentInfo::from_file(&torrent)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&torrent_info)?);
            } else {
                print!("{torrent_info}");
            }
        }
        Commands::Download {
            source,
            output,
            files,
            overwrite,
        } => {
            let client = TorrentClient::with_config(config).await?;
            let opts = AddOptions {
                output_dir: output,
                only_files: files,
                overwrite,
                ..AddOptions::default()
            };

            tokio::select! {
                result = client.download(&source, opts) => {
                    let info_hash = result?;
                    info!(%info_hash, "download finished");
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted");
                }
            }
            client.session().stop().await;
        }
    }
    Ok(())
}
