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


//! Downloader configuration
//!
//! Every field has a default, so a JSON file only needs the keys it changes:
//!
//! ```json
//! { "user_agent": "MyApp/2.0", "speed_window_secs": 5 }
//! ```

use crate::error::{DownloadError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Default moving-average window, in seconds
const DEFAULT_SPEED_WINDOW_SECS: u64 = 10;

/// Default read size for local-file sources
const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Largest accepted read size; one buffer of this size is allocated per chunk
pub const MAX_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Settings shared by all download wrappers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// User-Agent sent with the size probe and the transfer request
    pub user_agent: String,

    /// Extra request headers
    pub request_headers: HashMap<String, String>,

    /// Length of the speed calculator's moving window
    pub speed_window_secs: u64,

    /// Read size for local-file transfers (one progress tick per chunk)
    pub chunk_size: usize,

    /// Query the total size (HEAD / stat) before transferring
    pub probe_size: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("downloader-core/{}", env!("CARGO_PKG_VERSION")),
            request_headers: HashMap::new(),
            speed_window_secs: DEFAULT_SPEED_WINDOW_SECS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            probe_size: true,
        }
    }
}

impl DownloaderConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reject values the downloaders cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(DownloadError::invalid_config("chunk_size must be greater than zero"));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(DownloadError::invalid_config(format!(
                "chunk_size must be at most {} bytes",
                MAX_CHUNK_SIZE
            )));
        }
        if self.speed_window_secs == 0 {
            return Err(DownloadError::invalid_config(
                "speed_window_secs must be greater than zero",
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(DownloadError::invalid_config("user_agent must not be empty"));
        }
        Ok(())
    }

    pub fn speed_window(&self) -> Duration {
        Duration::from_secs(self.speed_window_secs)
    }
}
