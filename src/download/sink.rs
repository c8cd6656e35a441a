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


//! Where downloaded bytes go
//!
//! Memory sinks collect into a buffer. File sinks write to
//! `<name>.<attempt>.part` beside the destination and rename it over the
//! destination once the transfer is complete. A stopped or failed attempt
//! never leaves a truncated file under the final name, and cleaning up after
//! it only removes that attempt's own partial file.

use crate::error::{DownloadError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

// Buffer size for file writes
const WRITE_BUFF_SZ: usize = 64 * 1024;

/// What kind of sink an attempt needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SinkSpec {
    Memory,
    File(PathBuf),
}

pub(crate) enum Sink {
    Memory(Vec<u8>),
    File {
        writer: BufWriter<File>,
        partial: PathBuf,
        destination: PathBuf,
    },
}

impl Sink {
    pub async fn open(spec: &SinkSpec, attempt: u64) -> Result<Self> {
        match spec {
            SinkSpec::Memory => Ok(Sink::Memory(Vec::new())),
            SinkSpec::File(destination) => {
                if let Some(parent) = destination.parent() {
                    if !parent.as_os_str().is_empty() && !parent.is_dir() {
                        return Err(DownloadError::DestinationDirectoryNotFound(
                            parent.display().to_string(),
                        ));
                    }
                }

                let partial = partial_path(destination, attempt);
                let file = File::create(&partial).await?;
                Ok(Sink::File {
                    writer: BufWriter::with_capacity(WRITE_BUFF_SZ, file),
                    partial,
                    destination: destination.clone(),
                })
            }
        }
    }

    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        match self {
            Sink::Memory(buffer) => buffer.extend_from_slice(chunk),
            Sink::File { writer, .. } => writer.write_all(chunk).await?,
        }
        Ok(())
    }

    /// Finish the sink. Returns the buffered bytes for memory sinks and an
    /// empty buffer for file sinks, whose content is now at the destination.
    pub async fn finish(self) -> Result<Vec<u8>> {
        match self {
            Sink::Memory(buffer) => Ok(buffer),
            Sink::File {
                mut writer,
                partial,
                destination,
            } => {
                writer.flush().await?;
                writer.into_inner().sync_all().await?;
                tokio::fs::rename(&partial, &destination).await?;
                Ok(Vec::new())
            }
        }
    }
}

/// Partial file used by one attempt of a file download
pub(crate) fn partial_path(destination: &Path, attempt: u64) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("download"));
    name.push(format!(".{}.part", attempt));
    destination.with_file_name(name)
}

/// Remove an attempt's partial file if it is still there
pub(crate) async fn discard_partial(destination: &Path, attempt: u64) -> Result<()> {
    let partial = partial_path(destination, attempt);
    match tokio::fs::remove_file(&partial).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
