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


//! Transfer time and speed calculation
//!
//! Turns a stream of cumulative byte counts into a smoothed throughput and a
//! remaining-time estimate. Speed is averaged over a sliding window so short
//! network hiccups do not make the ETA jump around; when the window holds
//! fewer than two samples (first tick, or a stall longer than the window) the
//! cumulative average since start is used instead.
//!
//! Every method that reads the clock has an `_at` twin taking an explicit
//! [`Instant`], which is what the transfer loop and the tests use.

use crate::download::progress::DownloadProgress;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Default moving-average window
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
struct SpeedSample {
    /// Timestamp of this sample
    timestamp: Instant,

    /// Total bytes at this point in time
    position: u64,
}

/// Per-attempt time/speed calculator
#[derive(Debug, Clone)]
pub struct DownloadTimeCalculator {
    start_time: Instant,

    /// Expected size; `None` while the server has not reported one
    total_bytes: Option<u64>,

    bytes_received: u64,

    /// Time of the most recent sample
    last_update: Instant,

    /// Samples within the time window, oldest first
    samples: VecDeque<SpeedSample>,

    window: Duration,
}

impl DownloadTimeCalculator {
    /// Start timing now
    pub fn new(total_bytes: Option<u64>) -> Self {
        Self::starting_at(Instant::now(), total_bytes, DEFAULT_WINDOW)
    }

    /// Start timing now with a custom window
    pub fn with_window(total_bytes: Option<u64>, window: Duration) -> Self {
        Self::starting_at(Instant::now(), total_bytes, window)
    }

    /// Start timing at an explicit instant. A zero total is treated as unknown.
    pub fn starting_at(start_time: Instant, total_bytes: Option<u64>, window: Duration) -> Self {
        let mut samples = VecDeque::new();
        samples.push_back(SpeedSample {
            timestamp: start_time,
            position: 0,
        });

        Self {
            start_time,
            total_bytes: total_bytes.filter(|&n| n > 0),
            bytes_received: 0,
            last_update: start_time,
            samples,
            window,
        }
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Patch in a total reported after construction.
    ///
    /// A known total never decreases; zero and smaller values are ignored.
    pub fn set_total_bytes(&mut self, total_bytes: u64) {
        match self.total_bytes {
            Some(current) if current >= total_bytes => {}
            _ if total_bytes == 0 => {}
            _ => self.total_bytes = Some(total_bytes),
        }
    }

    /// Record the cumulative byte count at the current time
    pub fn update_download_times(&mut self, bytes_received: u64) {
        self.update_download_times_at(bytes_received, Instant::now());
    }

    /// Record the cumulative byte count at `now`
    pub fn update_download_times_at(&mut self, bytes_received: u64, now: Instant) {
        self.bytes_received = bytes_received;
        // Samples arriving out of order are clamped so time never runs backwards
        let now = now.max(self.last_update);
        self.last_update = now;

        self.samples.push_back(SpeedSample {
            timestamp: now,
            position: bytes_received,
        });

        while let Some(sample) = self.samples.front() {
            if now.duration_since(sample.timestamp) > self.window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Current throughput in bytes per second
    pub fn download_speed(&self) -> f64 {
        if let (Some(first), Some(last)) = (self.samples.front(), self.samples.back()) {
            let bytes_delta = last.position.saturating_sub(first.position);
            let time_delta = last.timestamp.duration_since(first.timestamp).as_secs_f64();
            if self.samples.len() >= 2 && time_delta > 0.0 {
                return finite_or_zero(bytes_delta as f64 / time_delta);
            }
        }
        self.average_speed_at(self.last_update)
    }

    /// Cumulative average since start, measured at `now`
    pub fn average_speed_at(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.start_time).as_secs_f64();
        if elapsed > 0.0 {
            finite_or_zero(self.bytes_received as f64 / elapsed)
        } else {
            0.0
        }
    }

    /// Estimated time to completion; `None` without a known total or a
    /// positive speed
    pub fn remaining_download_time(&self) -> Option<Duration> {
        let total = self.total_bytes?;
        let speed = self.download_speed();
        if speed <= 0.0 {
            return None;
        }
        let remaining = total.saturating_sub(self.bytes_received);
        Duration::try_from_secs_f64(remaining as f64 / speed).ok()
    }

    /// Percentage complete (0.0 - 100.0); 0 when the total is unknown
    pub fn percent_complete(&self) -> f64 {
        match self.total_bytes {
            Some(total) => {
                let percent = (self.bytes_received as f64 * 100.0) / total as f64;
                percent.clamp(0.0, 100.0)
            }
            None => 0.0,
        }
    }

    /// Time from start to the most recent sample
    pub fn elapsed(&self) -> Duration {
        self.last_update.duration_since(self.start_time)
    }

    /// Time from start to `now`
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start_time)
    }

    /// Snapshot for a `ProgressChanged` event
    pub fn progress(&self, attempt: u64) -> DownloadProgress {
        DownloadProgress {
            attempt,
            total_bytes: self.total_bytes,
            bytes_received: self.bytes_received,
            percent_complete: self.percent_complete(),
            bytes_per_second: self.download_speed(),
            elapsed: self.elapsed(),
            remaining: self.remaining_download_time(),
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_four_tick_scenario() {
        let start = Instant::now();
        let mut calc = DownloadTimeCalculator::starting_at(start, Some(1000), DEFAULT_WINDOW);

        let mut percents = Vec::new();
        for (i, bytes) in [250u64, 500, 750, 1000].into_iter().enumerate() {
            calc.update_download_times_at(bytes, start + secs(i as u64 + 1));
            percents.push(calc.progress(1).percent_complete);
        }

        assert_eq!(percents, vec![25.0, 50.0, 75.0, 100.0]);
        assert!((calc.download_speed() - 250.0).abs() < 1e-6);
        assert_eq!(calc.remaining_download_time(), Some(Duration::ZERO));
        assert_eq!(calc.elapsed(), secs(4));
    }

    #[test]
    fn test_remaining_time_matches_formula() {
        let start = Instant::now();
        let mut calc = DownloadTimeCalculator::starting_at(start, Some(10_000), DEFAULT_WINDOW);

        calc.update_download_times_at(1_000, start + secs(1));
        calc.update_download_times_at(2_000, start + secs(2));

        let speed = calc.download_speed();
        let expected = (10_000.0 - 2_000.0) / speed;
        let remaining = calc.remaining_download_time().unwrap().as_secs_f64();
        assert!((remaining - expected).abs() < 0.01);
        assert!((remaining - 8.0).abs() < 0.01);
    }

    #[test]
    fn test_zero_elapsed_gives_zero_speed() {
        let start = Instant::now();
        let mut calc = DownloadTimeCalculator::starting_at(start, Some(100), DEFAULT_WINDOW);
        calc.update_download_times_at(50, start);

        assert_eq!(calc.download_speed(), 0.0);
        assert_eq!(calc.remaining_download_time(), None);
    }

    #[test]
    fn test_unknown_total_has_no_eta() {
        let start = Instant::now();
        let mut calc = DownloadTimeCalculator::starting_at(start, None, DEFAULT_WINDOW);
        calc.update_download_times_at(4_096, start + secs(2));

        assert!(calc.download_speed() > 0.0);
        assert_eq!(calc.remaining_download_time(), None);
        assert_eq!(calc.percent_complete(), 0.0);

        let zero_total = DownloadTimeCalculator::starting_at(start, Some(0), DEFAULT_WINDOW);
        assert_eq!(zero_total.total_bytes(), None);
    }

    #[test]
    fn test_total_bytes_never_decreases() {
        let mut calc = DownloadTimeCalculator::new(None);
        calc.set_total_bytes(0);
        assert_eq!(calc.total_bytes(), None);

        calc.set_total_bytes(2_000);
        assert_eq!(calc.total_bytes(), Some(2_000));

        calc.set_total_bytes(1_000);
        assert_eq!(calc.total_bytes(), Some(2_000));

        calc.set_total_bytes(3_000);
        assert_eq!(calc.total_bytes(), Some(3_000));
    }

    #[test]
    fn test_window_drops_old_samples() {
        let start = Instant::now();
        let mut calc = DownloadTimeCalculator::starting_at(start, None, secs(2));

        // Fast start, then a much slower stretch
        calc.update_download_times_at(10_000, start + secs(1));
        calc.update_download_times_at(10_100, start + secs(5));
        calc.update_download_times_at(10_200, start + secs(6));

        // Only the last two samples remain in the 2s window: 100 B over 1s
        assert!((calc.download_speed() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_stall_longer_than_window_falls_back_to_average() {
        let start = Instant::now();
        let mut calc = DownloadTimeCalculator::starting_at(start, Some(1_000), secs(1));

        calc.update_download_times_at(500, start + secs(10));

        // Single sample in the window; cumulative 500 B / 10 s
        assert!((calc.download_speed() - 50.0).abs() < 1e-6);
        assert!(calc.remaining_download_time().is_some());
    }

    #[test]
    fn test_speed_never_negative_or_infinite() {
        let start = Instant::now();
        let mut calc = DownloadTimeCalculator::starting_at(start, Some(1_000), DEFAULT_WINDOW);

        calc.update_download_times_at(800, start + Duration::from_millis(1));
        calc.update_download_times_at(300, start + Duration::from_millis(2));
        // Out-of-order timestamp is clamped to the last update
        calc.update_download_times_at(400, start);

        let speed = calc.download_speed();
        assert!(speed.is_finite());
        assert!(speed >= 0.0);
    }

    #[test]
    fn test_speed_with_real_clock() {
        let mut calc = DownloadTimeCalculator::new(None);

        // Simulate downloading 1MB per second
        std::thread::sleep(Duration::from_millis(100));
        calc.update_download_times(100_000); // 100KB in ~100ms = ~1MB/s

        let speed = calc.download_speed();
        assert!(speed > 500_000.0 && speed < 1_100_000.0);
    }
}
