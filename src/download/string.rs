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


//! Download a resource into memory as text
//!
//! The body must be valid UTF-8; anything else fails the attempt with
//! `DownloadError::InvalidText` and the status becomes `Broken`.

use crate::config::DownloaderConfig;
use crate::download::events::EventHandler;
use crate::download::progress::DownloadProgress;
use crate::download::sink::SinkSpec;
use crate::download::source::{Credentials, Source};
use crate::download::status::DownloadStatus;
use crate::download::transfer::{Transfer, TransferKind};
use crate::error::{DownloadControlError, Result};
use uuid::Uuid;

pub(crate) struct TextTarget;

impl TransferKind for TextTarget {
    type Output = String;

    fn sink_spec(&self) -> SinkSpec {
        SinkSpec::Memory
    }

    fn finish(&self, buffered: Vec<u8>) -> Result<String> {
        Ok(String::from_utf8(buffered)?)
    }
}

/// Downloads one URL into a `String`
pub struct StringDownloader {
    transfer: Transfer<TextTarget>,
}

impl StringDownloader {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            transfer: Transfer::new(url, TextTarget)?,
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

    pub fn with_user_state(mut self, user_state: impl Into<String>) -> Self {
        self.transfer.set_user_state(user_state.into());
        self
    }

    pub fn on_event(mut self, handler: EventHandler<String>) -> Self {
        self.transfer.add_handler(handler);
        self
    }

    pub fn start_download(&self) -> std::result::Result<(), DownloadControlError> {
        self.transfer.start()
    }

    /// Stop the running attempt; status becomes `Cancelled`
    pub fn stop_download(&self) -> std::result::Result<(), DownloadControlError> {
        self.transfer.stop(false)
    }

    pub fn status(&self) -> DownloadStatus {
        self.transfer.status()
    }

    pub fn is_busy(&self) -> bool {
        self.transfer.is_busy()
    }

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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::events::{self, DownloadEvent};
    use crate::download::progress::DownloadCompletion;
    use crate::error::DownloadError;
    use tokio::sync::mpsc::UnboundedReceiver;

    async fn run_to_completion(
        downloader: &StringDownloader,
        rx: &mut UnboundedReceiver<DownloadEvent<String>>,
    ) -> DownloadCompletion<String> {
        downloader.start_download().unwrap();
        loop {
            match rx.recv().await {
                Some(DownloadEvent::Completed(done)) => return done,
                Some(_) => continue,
                None => panic!("channel closed"),
            }
        }
    }

    #[tokio::test]
    async fn test_local_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "grüße\n").unwrap();

        let (handler, mut rx) = events::channel();
        let downloader = StringDownloader::new(path.to_str().unwrap())
            .unwrap()
            .on_event(handler);

        let done = run_to_completion(&downloader, &mut rx).await;
        assert!(done.is_success());
        assert_eq!(done.result.as_deref(), Some("grüße\n"));
        assert!(!downloader.is_busy());
    }

    #[tokio::test]
    async fn test_invalid_utf8_breaks_download() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.txt");
        std::fs::write(&path, [0xffu8, 0xfe, 0x00]).unwrap();

        let (handler, mut rx) = events::channel();
        let downloader = StringDownloader::new(path.to_str().unwrap())
            .unwrap()
            .on_event(handler);

        let done = run_to_completion(&downloader, &mut rx).await;
        assert!(done.result.is_none());
        assert!(matches!(
            done.error.as_deref(),
            Some(DownloadError::InvalidText(_))
        ));
        assert_eq!(downloader.status(), DownloadStatus::Broken);
    }

    #[tokio::test]
    async fn test_restart_after_completion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "again").unwrap();

        let (handler, mut rx) = events::channel();
        let downloader = StringDownloader::new(path.to_str().unwrap())
            .unwrap()
            .on_event(handler);

        let first = run_to_completion(&downloader, &mut rx).await;
        let second = run_to_completion(&downloader, &mut rx).await;
        assert_eq!(first.attempt, 1);
        assert_eq!(second.attempt, 2);
        assert_eq!(second.result.as_deref(), Some("again"));
        assert_eq!(downloader.attempt(), 2);
    }
}
