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


//! Progress and completion payloads
//!
//! # Progress Information
//! - Bytes received / total bytes (total may be unknown)
//! - Current speed with moving average
//! - Time elapsed and remaining (estimated)
//! - Percentage complete
//!
//! Plus display helpers for rendering progress labels.

use crate::error::DownloadError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Snapshot raised with every progress tick
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    /// Attempt this tick belongs to
    pub attempt: u64,

    /// Expected size, `None` while unknown
    pub total_bytes: Option<u64>,

    /// Bytes received so far
    pub bytes_received: u64,

    /// Percentage complete (0.0 - 100.0)
    pub percent_complete: f64,

    /// Current download speed in bytes per second
    pub bytes_per_second: f64,

    /// Time since the attempt started
    pub elapsed: Duration,

    /// Estimated time remaining, `None` when it cannot be estimated
    pub remaining: Option<Duration>,
}

impl DownloadProgress {
    /// Format progress as display string, e.g.
    /// `45.0% (450.0 KB / 1.0 MB) - 120.0 KB/s - 4s`
    pub fn display_string(&self) -> String {
        let total = self
            .total_bytes
            .map(format_bytes)
            .unwrap_or_else(|| "?".to_string());
        format!(
            "{:.1}% ({} / {}) - {} - {}",
            self.percent_complete,
            format_bytes(self.bytes_received),
            total,
            format_speed(self.bytes_per_second),
            format_eta(self.remaining)
        )
    }
}

/// Payload of the single `Completed` event raised per attempt
#[derive(Debug, Clone)]
pub struct DownloadCompletion<T> {
    /// Attempt this completion belongs to
    pub attempt: u64,

    /// Average throughput over the whole attempt
    pub average_bytes_per_second: f64,

    /// Time from start to completion
    pub elapsed: Duration,

    /// Wall-clock time the attempt ended
    pub finished_at: DateTime<Utc>,

    /// True when the attempt ended because of a stop request
    pub was_cancelled: bool,

    /// Transport error, if the attempt failed
    pub error: Option<Arc<DownloadError>>,

    /// Caller-supplied tag set on the wrapper
    pub user_state: Option<String>,

    /// Downloaded content; present only when the attempt succeeded
    pub result: Option<T>,
}

impl<T> DownloadCompletion<T> {
    /// Finished normally, with a result
    pub fn is_success(&self) -> bool {
        !self.was_cancelled && self.error.is_none()
    }
}

/// Format bytes as human-readable string (e.g., "45.2 MB")
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1_000 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1_000.0;
    let mut unit = 0;
    while value >= 1_000.0 && unit < UNITS.len() - 1 {
        value /= 1_000.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Format download speed as human-readable string (e.g., "2.5 MB/s")
pub fn format_speed(bytes_per_second: f64) -> String {
    if !bytes_per_second.is_finite() || bytes_per_second <= 0.0 {
        return "0 B/s".to_string();
    }
    format!("{}/s", format_bytes(bytes_per_second.round() as u64))
}

/// Format ETA as human-readable string (e.g., "5m 30s")
pub fn format_eta(remaining: Option<Duration>) -> String {
    let Some(remaining) = remaining else {
        return "calculating...".to_string();
    };

    let total = remaining.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(45_200_000), "45.2 MB");
        assert_eq!(format_bytes(1_500), "1.5 KB");
        assert_eq!(format_bytes(3_000_000_000_000_000), "3000.0 TB");
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(2_500_000.0), "2.5 MB/s");
        assert_eq!(format_speed(0.0), "0 B/s");
        assert_eq!(format_speed(f64::INFINITY), "0 B/s");
    }

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(None), "calculating...");
        assert_eq!(format_eta(Some(Duration::from_secs(42))), "42s");
        assert_eq!(format_eta(Some(Duration::from_secs(330))), "5m 30s");
        assert_eq!(format_eta(Some(Duration::from_secs(7_380))), "2h 3m");
    }

    #[test]
    fn test_display_string() {
        let progress = DownloadProgress {
            attempt: 1,
            total_bytes: Some(1_000_000),
            bytes_received: 450_000,
            percent_complete: 45.0,
            bytes_per_second: 120_000.0,
            elapsed: Duration::from_secs(4),
            remaining: Some(Duration::from_secs(4)),
        };
        assert_eq!(
            progress.display_string(),
            "45.0% (450.0 KB / 1.0 MB) - 120.0 KB/s - 4s"
        );

        let unknown = DownloadProgress { total_bytes: None, remaining: None, ..progress };
        assert!(unknown.display_string().contains("/ ?"));
        assert!(unknown.display_string().ends_with("calculating..."));
    }

    #[test]
    fn test_completion_success() {
        let completion: DownloadCompletion<Vec<u8>> = DownloadCompletion {
            attempt: 1,
            average_bytes_per_second: 10.0,
            elapsed: Duration::from_secs(1),
            finished_at: Utc::now(),
            was_cancelled: false,
            error: None,
            user_state: None,
            result: Some(vec![1, 2, 3]),
        };
        assert!(completion.is_success());

        let cancelled = DownloadCompletion { was_cancelled: true, ..completion };
        assert!(!cancelled.is_success());
    }
}
