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


//! Download task wrappers
//!
//! Three wrappers share one transfer engine and differ only in where the
//! bytes end up:
//!
//! - [`DataDownloader`]: `Vec<u8>` in memory
//! - [`StringDownloader`]: UTF-8 `String` in memory
//! - [`FileDownloader`]: a file on disk
//!
//! Each wrapper runs at most one attempt at a time, reports progress through
//! bound [`DownloadEvent`] handlers, and follows the [`DownloadStatus`]
//! state machine.

pub mod calculator;
pub mod events;
pub mod progress;
pub mod source;
pub mod status;

mod data;
mod file;
mod sink;
mod string;
mod transfer;

// Re-export commonly used types
pub use calculator::DownloadTimeCalculator;
pub use data::DataDownloader;
pub use events::{DownloadEvent, EventHandler};
pub use file::FileDownloader;
pub use progress::{DownloadCompletion, DownloadProgress};
pub use source::{Credentials, Source};
pub use status::{DownloadStatus, StatusChange};
pub use string::StringDownloader;
