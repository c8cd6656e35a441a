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


//! downloader-core: download a URL into memory, a string or a file while
//! tracking status, throughput and ETA.

pub mod colors;
pub mod config;
pub mod download;
pub mod error;

pub use config::DownloaderConfig;
pub use download::{
    Credentials, DataDownloader, DownloadCompletion, DownloadEvent, DownloadProgress,
    DownloadStatus, FileDownloader, StringDownloader,
};
pub use error::{DownloadControlError, DownloadError, Result};
