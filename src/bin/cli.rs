// downloader-core - Download task wrappers with progress tracking
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use downloader_core::download::events;
use downloader_core::download::progress::{format_bytes, format_speed};
use downloader_core::{
    Credentials, DataDownloader, DownloadCompletion, DownloadEvent, DownloaderConfig,
    FileDownloader, StringDownloader,
};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Parser)]
#[command(name = "downloader-cli")]
#[command(about = "Download a URL with live progress", long_about = None)]
struct Cli {
    /// User name for HTTP basic auth
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Password for HTTP basic auth
    #[arg(short, long, global = true, requires = "user")]
    password: Option<String>,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download to a file
    File {
        /// Source URL or path
        url: String,
        /// Destination path
        dest: PathBuf,
    },
    /// Download and print as text
    Text {
        /// Source URL or path
        url: String,
    },
    /// Download into memory and report the size
    Data {
        /// Source URL or path
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => DownloaderConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => DownloaderConfig::default(),
    };
    let credentials = cli
        .user
        .as_ref()
        .map(|user| Credentials::new(user.as_str(), cli.password.clone().unwrap_or_default()));

    match cli.command {
        Commands::File { url, dest } => {
            let (handler, rx) = events::channel();
            let mut downloader = FileDownloader::new(&url, dest)?
                .with_config(config)?
                .on_event(handler);
            if let Some(credentials) = credentials {
                downloader = downloader.with_credentials(credentials);
            }

            downloader.start_download()?;
            let done = drive(rx, || downloader.stop_download(false).is_ok()).await?;
            if let Some(path) = done.result {
                println!(
                    "Saved {} at {}",
                    path.display(),
                    format_speed(done.average_bytes_per_second)
                );
            }
        }
        Commands::Text { url } => {
            let (handler, rx) = events::channel();
            let mut downloader = StringDownloader::new(&url)?
                .with_config(config)?
                .on_event(handler);
            if let Some(credentials) = credentials {
                downloader = downloader.with_credentials(credentials);
            }

            downloader.start_download()?;
            let done = drive(rx, || downloader.stop_download().is_ok()).await?;
            if let Some(text) = done.result {
                println!("{}", text);
            }
        }
        Commands::Data { url } => {
            let (handler, rx) = events::channel();
            let mut downloader = DataDownloader::new(&url)?
                .with_config(config)?
                .on_event(handler);
            if let Some(credentials) = credentials {
                downloader = downloader.with_credentials(credentials);
            }

            downloader.start_download()?;
            let done = drive(rx, || downloader.stop_download().is_ok()).await?;
            if let Some(bytes) = done.result {
                println!("Received {}", format_bytes(bytes.len() as u64));
            }
        }
    }

    Ok(())
}

/// Print progress until the attempt completes; Ctrl-C stops it
async fn drive<T>(
    mut rx: UnboundedReceiver<DownloadEvent<T>>,
    stop: impl Fn() -> bool,
) -> Result<DownloadCompletion<T>> {
    let mut stop_sent = false;
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(DownloadEvent::ProgressChanged(progress)) => {
                    eprintln!("{}", progress.display_string());
                }
                Some(DownloadEvent::StatusChanged(change)) => {
                    log::debug!("Status {} -> {}", change.previous, change.current);
                }
                Some(DownloadEvent::Completed(done)) => {
                    if let Some(error) = &done.error {
                        bail!("Download failed: {}", error.user_message());
                    }
                    if done.was_cancelled {
                        bail!("Download cancelled");
                    }
                    return Ok(done);
                }
                Some(DownloadEvent::Started { attempt }) => {
                    log::debug!("Attempt {} started", attempt);
                }
                None => bail!("Downloader went away before completing"),
            },
            _ = tokio::signal::ctrl_c(), if !stop_sent => {
                eprintln!("Stopping...");
                stop_sent = true;
                if !stop() {
                    log::warn!("Nothing to stop");
                }
            }
        }
    }
}
