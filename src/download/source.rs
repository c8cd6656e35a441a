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


//! Download sources and the byte streams they produce
//!
//! # Supported Sources
//! - `http://` and `https://` URLs, fetched with a single GET
//! - `file://` URLs and plain file-system paths, read in `chunk_size` pieces
//!
//! # Pre-flight Sizing
//! Before the transfer a best-effort size query seeds the calculator:
//! HTTP `HEAD` (the `Content-Length` header is read directly, since
//! reqwest reports a zero body length for HEAD responses) or a file-system
//! `stat`. A failed query only costs the early ETA; the total is patched
//! from the transfer response instead.

use crate::config::DownloaderConfig;
use crate::error::{DownloadError, Result};
use futures_util::stream::{self, BoxStream, StreamExt};
use log::{debug, warn};
use reqwest::header::{CONTENT_LENGTH, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use url::Url;

/// User name and password attached to a download
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"********")
            .finish()
    }
}

/// Where a download reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Http(Url),
    Local(PathBuf),
}

impl Source {
    /// Interpret a URL or path.
    ///
    /// Strings that are not URLs (relative or absolute paths, Windows drive
    /// paths) are taken as local files. `ftp` and other schemes are refused.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DownloadError::InvalidUrl("empty URL".to_string()));
        }

        match Url::parse(trimmed) {
            Ok(url) => match url.scheme() {
                "http" | "https" => {
                    if url.host_str().map_or(true, str::is_empty) {
                        return Err(DownloadError::InvalidUrl(format!("missing host: {}", trimmed)));
                    }
                    Ok(Source::Http(url))
                }
                "file" => url
                    .to_file_path()
                    .map(Source::Local)
                    .map_err(|_| DownloadError::InvalidUrl(format!("bad file URL: {}", trimmed))),
                // Drive letter, e.g. C:\downloads\a.bin
                scheme if scheme.len() == 1 => Ok(Source::Local(PathBuf::from(trimmed))),
                scheme => Err(DownloadError::UnsupportedScheme(scheme.to_string())),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(Source::Local(PathBuf::from(trimmed)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Display form used in logs and errors
    pub fn as_display(&self) -> String {
        match self {
            Source::Http(url) => url.to_string(),
            Source::Local(path) => path.display().to_string(),
        }
    }

    /// Best-effort size query. Every failure maps to `None`.
    pub(crate) async fn probe_size(
        &self,
        client: &Client,
        credentials: Option<&Credentials>,
        config: &DownloaderConfig,
    ) -> Option<u64> {
        let size = match self {
            Source::Http(url) => {
                let request = prepare(client.head(url.clone()), credentials, config);
                match request.send().await {
                    Ok(response) if response.status().is_success() => response
                        .headers()
                        .get(CONTENT_LENGTH)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.trim().parse::<u64>().ok()),
                    Ok(response) => {
                        warn!("Size probe for {} returned {}", url, response.status());
                        None
                    }
                    Err(e) => {
                        warn!("Size probe for {} failed: {}", url, e);
                        None
                    }
                }
            }
            Source::Local(path) => match tokio::fs::metadata(path).await {
                Ok(meta) if meta.is_file() => Some(meta.len()),
                Ok(_) => None,
                Err(e) => {
                    warn!("Size probe for {} failed: {}", path.display(), e);
                    None
                }
            },
        };

        debug!("Size probe for {}: {:?}", self.as_display(), size);
        size.filter(|&n| n > 0)
    }

    /// Issue the transfer and return its chunk stream
    pub(crate) async fn open(
        &self,
        client: &Client,
        credentials: Option<&Credentials>,
        config: &DownloaderConfig,
    ) -> Result<TransferBody> {
        match self {
            Source::Http(url) => {
                let response = prepare(client.get(url.clone()), credentials, config)
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(DownloadError::HttpStatus {
                        status_code: response.status().as_u16(),
                        url: url.to_string(),
                    });
                }

                let reported_total = response.content_length().filter(|&n| n > 0);
                let chunks = response
                    .bytes_stream()
                    .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(DownloadError::from))
                    .boxed();

                Ok(TransferBody { reported_total, chunks })
            }
            Source::Local(path) => open_local(path, config.chunk_size).await,
        }
    }
}

/// Byte stream of one transfer
pub(crate) struct TransferBody {
    /// Size reported by the transport when the transfer began
    pub reported_total: Option<u64>,

    pub chunks: BoxStream<'static, Result<Vec<u8>>>,
}

fn prepare(
    mut request: RequestBuilder,
    credentials: Option<&Credentials>,
    config: &DownloaderConfig,
) -> RequestBuilder {
    request = request.header(USER_AGENT, config.user_agent.as_str());
    for (key, value) in &config.request_headers {
        request = request.header(key.as_str(), value.as_str());
    }
    if let Some(credentials) = credentials {
        request = request.basic_auth(credentials.user(), Some(credentials.password()));
    }
    request
}

async fn open_local(path: &Path, chunk_size: usize) -> Result<TransferBody> {
    let file = tokio::fs::File::open(path).await?;
    let reported_total = file.metadata().await.ok().map(|m| m.len()).filter(|&n| n > 0);

    let chunks = stream::try_unfold(file, move |mut file| async move {
        read_chunk(&mut file, chunk_size)
            .await
            .map(|chunk| chunk.map(|buf| (buf, file)))
    })
    .boxed();

    Ok(TransferBody { reported_total, chunks })
}

/// Fill up to `chunk_size` bytes; `None` at end of file
async fn read_chunk(file: &mut tokio::fs::File, chunk_size: usize) -> Result<Option<Vec<u8>>> {
    let mut buf = vec![0u8; chunk_size];
    let mut filled = 0;
    while filled < chunk_size {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    if filled == 0 {
        return Ok(None);
    }
    buf.truncate(filled);
    Ok(Some(buf))
}
