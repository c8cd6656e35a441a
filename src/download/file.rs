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


//! Download a resource to a file on disk
//!
//! # Usage Example
//! ```no_run
//! use downloader_core::download::{events, DownloadEvent, FileDownloader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (handler, mut events) = events::channel();
//! let downloader = FileDownloader::new("https://example.com/big.iso", "/tmp/big.iso")?
//!     .on_event(handler);
//!
//! downloader.start_download()?;
//! while let Some(event) = events.recv().await {
//!     match event {
//!         DownloadEvent::ProgressChanged(p) => println!("{}", p.display_string()),
//!         DownloadEvent::Completed(done) => {
//!             println!("finished, cancelled = {}", done.was_cancelled);
//!             break;
//!         }
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::DownloaderConfig;
use crate::download::events::EventHandler;
use crate::download::progress::DownloadProgress;
use crate::download::sink::SinkSpec;
use crate::download::source::{Credentials, Source};
use crate::download::status::DownloadStatus;
use crate::download::transfer::{Transfer, TransferKind};
use crate::error::{DownloadControlError, Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub(crate) struct FileTarget {
    destination: PathBuf,
}

impl TransferKind for FileTarget {
    type Output = PathBuf;

    fn sink_spec(&self) -> SinkSpec {
        SinkSpec::File(self.destination.clone())
    }

    fn finish(&self, _buffered: Vec<u8>) -> Result<PathBuf> {
        Ok(self.destination.clone())
    }
}

/// Downloads one URL to a destination path.
///
/// Completion reports the destination path as its result. The average speed
/// in the completion is the final file size over the elapsed time.
pub struct FileDownloader {
    transfer: Transfer<FileTarget>,
}

impl FileDownloader {
    pub fn new(url: &str, destination: impl Into<PathBuf>) -> Result<Self> {
        let target = FileTarget {
            destination: destination.into(),
        };
        Ok(Self {
            transfer: Transfer::new(url, target)?,
        })
    }

    pub fn with_config(mut self, config: DownloaderConfig) -> Result<Self> {
        self.transfer.set_config(config)?;
        Ok(self)
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.transfer.set_credentials(credentials);
        self
    }

    /// Tag echoed back in every completion
    pub fn with_user_state(mut self, user_state: impl Into<String>) -> Self {
        self.transfer.set_user_state(user_state.into());
        self
    }

    /// Bind an event handler for the lifetime of this downloader
    pub fn on_event(mut self, handler: EventHandler<PathBuf>) -> Self {
        self.transfer.add_handler(handler);
        self
    }

    /// Begin a new attempt. Fails if one is already running.
    pub fn start_download(&self) -> std::result::Result<(), DownloadControlError> {
        self.transfer.start()
    }

    /// Stop the running attempt; status becomes `Broken` when
    /// `mark_as_broken` is set, `Cancelled` otherwise.
    pub fn stop_download(&self, mark_as_broken: bool) -> std::result::Result<(), DownloadControlError> {
        self.transfer.stop(mark_as_broken)
    }

    pub fn status(&self) -> DownloadStatus {
        self.transfer.status()
    }

    pub fn is_busy(&self) -> bool {
        self.transfer.is_busy()
    }

    /// Last progress snapshot of the current attempt
    pub fn progress(&self) -> Option<DownloadProgress> {
        self.transfer.progress()
    }

    pub fn attempt(&self) -> u64 {
        self.transfer.attempt()
    }

    pub fn id(&self) -> Uuid {
        self.transfer.id()
    }

    pub fn url(&self) -> &Source {
        self.transfer.source()
    }

    pub fn destination(&self) -> &Path {
        &self.transfer.kind().destination
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::events::{self, DownloadEvent};
    use crate::download::progress::DownloadCompletion;
    use tokio::sync::mpsc::UnboundedReceiver;

    async fn wait_for_completion(
        rx: &mut UnboundedReceiver<DownloadEvent<PathBuf>>,
    ) -> (Vec<DownloadEvent<PathBuf>>, DownloadCompletion<PathBuf>) {
        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            if let DownloadEvent::Completed(done) = event {
                return (seen, done);
            }
            seen.push(event);
        }
        panic!("event channel closed before completion");
    }

    fn local_config(chunk_size: usize) -> DownloaderConfig {
        DownloaderConfig {
            chunk_size,
            ..DownloaderConfig::default()
        }
    }

    #[tokio::test]
    async fn test_thousand_byte_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.bin");
        let destination = dir.path().join("copy.bin");
        let payload: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&source, &payload).unwrap();

        let (handler, mut rx) = events::channel();
        let downloader = FileDownloader::new(source.to_str().unwrap(), &destination)
            .unwrap()
            .with_config(local_config(250))
            .unwrap()
            .on_event(handler);

        downloader.start_download().unwrap();
        let (seen, done) = wait_for_completion(&mut rx).await;

        let percents: Vec<f64> = seen
            .iter()
            .filter_map(|e| match e {
                DownloadEvent::ProgressChanged(p) => Some(p.percent_complete),
                _ => None,
            })
            .collect();
        assert_eq!(percents, vec![25.0, 50.0, 75.0, 100.0]);

        assert!(!done.was_cancelled);
        assert!(done.error.is_none());
        assert_eq!(done.result.as_deref(), Some(destination.as_path()));
        assert_eq!(std::fs::read(&destination).unwrap(), payload);

        let secs = done.elapsed.as_secs_f64();
        if secs > 0.0 {
            assert!((done.average_bytes_per_second - 1000.0 / secs).abs() < 1e-6);
        } else {
            assert_eq!(done.average_bytes_per_second, 0.0);
        }
        assert_eq!(downloader.status(), DownloadStatus::Completed);
    }

    #[tokio::test]
    async fn test_event_order() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.txt");
        std::fs::write(&source, b"abc").unwrap();

        let (handler, mut rx) = events::channel();
        let downloader = FileDownloader::new(source.to_str().unwrap(), dir.path().join("out.txt"))
            .unwrap()
            .on_event(handler);
        downloader.start_download().unwrap();

        let (seen, done) = wait_for_completion(&mut rx).await;
        assert!(matches!(
            seen[0],
            DownloadEvent::StatusChanged(change) if change.current == DownloadStatus::Downloading
        ));
        assert!(matches!(seen[1], DownloadEvent::Started { attempt: 1 }));
        assert!(matches!(
            seen.last(),
            Some(DownloadEvent::StatusChanged(change)) if change.current == DownloadStatus::Completed
        ));
        assert_eq!(done.attempt, 1);
    }

    #[tokio::test]
    async fn test_restart_keeps_status_events_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.bin");
        std::fs::write(&source, vec![3u8; 2048]).unwrap();

        let (handler, mut rx) = events::channel();
        let downloader = FileDownloader::new(source.to_str().unwrap(), dir.path().join("out.bin"))
            .unwrap()
            .with_config(local_config(512))
            .unwrap()
            .on_event(handler);

        const ROUNDS: u64 = 5;
        for _ in 0..ROUNDS {
            downloader.start_download().unwrap();
            // Restart the moment the status leaves Downloading
            while downloader.is_busy() {
                tokio::task::yield_now().await;
            }
        }

        let mut changes = Vec::new();
        let mut completed = 0;
        while completed < ROUNDS {
            match rx.recv().await.unwrap() {
                DownloadEvent::StatusChanged(change) => changes.push(change),
                DownloadEvent::Completed(done) => {
                    assert!(done.is_success());
                    completed += 1;
                }
                _ => {}
            }
        }

        assert_eq!(changes.len() as u64, ROUNDS * 2);
        assert_eq!(changes[0].previous, DownloadStatus::NotStarted);
        for pair in changes.windows(2) {
            assert_eq!(pair[1].previous, pair[0].current, "broken chain: {:?}", changes);
        }
        assert_eq!(downloader.status(), DownloadStatus::Completed);
    }

    #[tokio::test]
    async fn test_missing_directory_breaks_download() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.txt");
        std::fs::write(&source, b"abc").unwrap();

        let (handler, mut rx) = events::channel();
        let downloader =
            FileDownloader::new(source.to_str().unwrap(), dir.path().join("nope").join("out.txt"))
                .unwrap()
                .on_event(handler);
        downloader.start_download().unwrap();

        let (_, done) = wait_for_completion(&mut rx).await;
        assert!(!done.was_cancelled);
        assert!(done.error.is_some());
        assert_eq!(done.average_bytes_per_second, 0.0);
        assert_eq!(downloader.status(), DownloadStatus::Broken);
    }

    #[tokio::test]
    async fn test_stop_while_idle() {
        let dir = tempfile::tempdir().unwrap();
        let downloader =
            FileDownloader::new("https://example.com/a.bin", dir.path().join("a.bin")).unwrap();
        assert_eq!(
            downloader.stop_download(false),
            Err(DownloadControlError::NotInProgress)
        );
        assert_eq!(downloader.status(), DownloadStatus::NotStarted);
    }

    #[test]
    fn test_start_without_runtime() {
        let downloader = FileDownloader::new("https://example.com/a.bin", "/tmp/a.bin").unwrap();
        assert_eq!(downloader.start_download(), Err(DownloadControlError::NoRuntime));
        assert_eq!(downloader.status(), DownloadStatus::NotStarted);
    }

    #[test]
    fn test_destination_accessor() {
        let downloader = FileDownloader::new("https://example.com/a.bin", "/tmp/a.bin").unwrap();
        assert_eq!(downloader.destination(), Path::new("/tmp/a.bin"));
        assert_eq!(downloader.attempt(), 0);
        assert!(downloader.progress().is_none());
    }
}
