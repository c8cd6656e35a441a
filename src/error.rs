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


//! Error types for downloader-core
//!
//! Two error families reach the caller by different routes:
//!
//! - [`DownloadControlError`] is returned synchronously from
//!   `start_download` / `stop_download` when a wrapper is misused (double start,
//!   stop while idle). These never travel through the async transfer.
//! - [`DownloadError`] covers construction, configuration and transport
//!   failures. Transport failures are captured by the transfer task and handed
//!   to the caller only through the `Completed` event's `error` field.

use thiserror::Error;

/// Result type alias using our DownloadError type
pub type Result<T> = std::result::Result<T, DownloadError>;

/// Main error type for downloader-core
#[derive(Error, Debug)]
pub enum DownloadError {
    // ===== Construction / Configuration Errors =====

    /// Source string could not be interpreted as a URL or path
    #[error("Invalid download URL: {0}")]
    InvalidUrl(String),

    /// URL scheme is recognised but no transport is available for it
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // ===== Transport Errors =====

    /// Server answered the transfer request with a non-success status
    #[error("Server responded with unexpected status code {status_code} for {url}")]
    HttpStatus {
        status_code: u16,
        url: String,
    },

    /// Transfer ended before the reported total was received
    #[error("Download incomplete: received {received} of {expected} bytes")]
    IncompleteTransfer {
        expected: u64,
        received: u64,
    },

    /// Destination directory for a file download does not exist
    #[error("Download directory does not exist: {0}")]
    DestinationDirectoryNotFound(String),

    /// Downloaded body is not valid UTF-8 (string downloads)
    #[error("Downloaded content is not valid UTF-8: {0}")]
    InvalidText(String),

    // ===== External Library Errors =====

    /// HTTP client error from reqwest
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl From<std::string::FromUtf8Error> for DownloadError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        DownloadError::InvalidText(err.to_string())
    }
}

impl DownloadError {
    /// Create an InvalidConfiguration error with a message
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        DownloadError::InvalidConfiguration(message.into())
    }

    /// Check if the error happened while moving bytes, as opposed to while
    /// building a wrapper or reading configuration
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            DownloadError::HttpStatus { .. }
                | DownloadError::IncompleteTransfer { .. }
                | DownloadError::DestinationDirectoryNotFound(_)
                | DownloadError::InvalidText(_)
                | DownloadError::ReqwestError(_)
                | DownloadError::IoError(_)
        )
    }

    /// HTTP status code carried by the error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DownloadError::HttpStatus { status_code, .. } => Some(*status_code),
            DownloadError::ReqwestError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Get user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            DownloadError::HttpStatus { status_code: 401 | 403, .. } => {
                "The server refused access. Please check the user name and password.".to_string()
            }
            DownloadError::HttpStatus { status_code: 404, .. } => {
                "The requested file was not found on the server.".to_string()
            }
            DownloadError::IncompleteTransfer { expected, received } => {
                format!(
                    "The connection closed early ({} of {} bytes received). Please try again.",
                    received, expected
                )
            }
            DownloadError::DestinationDirectoryNotFound(dir) => {
                format!("The folder '{}' does not exist.", dir)
            }
            DownloadError::UnsupportedScheme(scheme) => {
                format!("Downloads over '{}' are not supported.", scheme)
            }
            _ => self.to_string(),
        }
    }
}

/// Misuse of a download wrapper's start/stop controls
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadControlError {
    /// `start_download` called while a transfer is running
    #[error("A download is already in progress")]
    AlreadyInProgress,

    /// `stop_download` called while no transfer is running
    #[error("No download in progress")]
    NotInProgress,

    /// `start_download` called outside a tokio runtime
    #[error("start_download must be called from within a tokio runtime")]
    NoRuntime,
}
