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


//! Download a resource into memory as raw bytes

use crate::config::DownloaderConfig;
use crate::download::events::EventHandler;
use crate::download::progress::DownloadProgress;
use crate::download::sink::SinkSpec;
use crate::download::source::{Credentials, Source};
use crate::download::status::DownloadStatus;
use crate::download::transfer::{Transfer, TransferKind};
use crate::error::{DownloadControlError, Result};
use uuid::Uuid;

pub(crate) struct BytesTarget;

impl TransferKind for BytesTarget {
    type Output = Vec<u8>;

    fn sink_spec(&self) -> SinkSpec {
        SinkSpec::Memory
    }

    fn finish(&self, buffered: Vec<u8>) -> Result<Vec<u8>> {
        Ok(buffered)
    }
}

/// Downloads one URL into a byte buffer
pub struct DataDownloader {
    transfer: Transfer<BytesTarget>,
}

impl DataDownloader {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            transfer: Transfer::new(url, BytesTarget)?,
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

    pub fn on_event(mut self, handler: EventHandler<Vec<u8>>) -> Self {
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
