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


//! Download status state machine
//!
//! ```text
//! NotStarted ──start──▶ Downloading ──finish──▶ Completed
//!                          │   ▲      ──error───▶ Broken
//!                          │   │      ──stop────▶ Cancelled | Broken
//!                          │   └──start── (any terminal state)
//! ```

use crate::error::DownloadControlError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a download wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DownloadStatus {
    /// No attempt has been started yet
    #[default]
    NotStarted,
    /// A transfer is in flight
    Downloading,
    /// The last attempt finished normally
    Completed,
    /// The last attempt was stopped by the caller
    Cancelled,
    /// The last attempt failed, or was stopped and marked as broken
    Broken,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::NotStarted => "not_started",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Completed => "completed",
            DownloadStatus::Cancelled => "cancelled",
            DownloadStatus::Broken => "broken",
        }
    }

    /// Completed, Cancelled or Broken
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadStatus::Completed | DownloadStatus::Cancelled | DownloadStatus::Broken
        )
    }

    pub fn is_busy(&self) -> bool {
        *self == DownloadStatus::Downloading
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a `StatusChanged` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub previous: DownloadStatus,
    pub current: DownloadStatus,
}

impl StatusChange {
    /// False for a reassignment of the same status; no event is raised then
    pub fn is_change(&self) -> bool {
        self.previous != self.current
    }
}

/// How an attempt ended on its own (without a stop request)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Finish {
    Succeeded,
    Failed,
}

/// Owns the status of one wrapper and enforces its transitions
#[derive(Debug, Default)]
pub(crate) struct StatusMachine {
    status: DownloadStatus,
}

impl StatusMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> DownloadStatus {
        self.status
    }

    /// Enter `Downloading`; refused while already downloading
    pub fn begin(&mut self) -> Result<StatusChange, DownloadControlError> {
        if self.status.is_busy() {
            return Err(DownloadControlError::AlreadyInProgress);
        }
        Ok(self.assign(DownloadStatus::Downloading))
    }

    /// Caller-requested stop; refused unless downloading
    pub fn stop(&mut self, mark_as_broken: bool) -> Result<StatusChange, DownloadControlError> {
        if !self.status.is_busy() {
            return Err(DownloadControlError::NotInProgress);
        }
        let target = if mark_as_broken {
            DownloadStatus::Broken
        } else {
            DownloadStatus::Cancelled
        };
        Ok(self.assign(target))
    }

    /// Transfer ended by itself. Ignored unless still downloading, since a
    /// stop request has already picked the terminal state.
    pub fn finish(&mut self, finish: Finish) -> Option<StatusChange> {
        if !self.status.is_busy() {
            return None;
        }
        let next = match finish {
            Finish::Succeeded => DownloadStatus::Completed,
            Finish::Failed => DownloadStatus::Broken,
        };
        Some(self.assign(next))
    }

    fn assign(&mut self, next: DownloadStatus) -> StatusChange {
        let change = StatusChange {
            previous: self.status,
            current: next,
        };
        self.status = next;
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_from_not_started() {
        let mut machine = StatusMachine::new();
        let change = machine.begin().unwrap();
        assert_eq!(change.previous, DownloadStatus::NotStarted);
        assert_eq!(change.current, DownloadStatus::Downloading);
        assert!(machine.current().is_busy());
    }

    #[test]
    fn test_double_start_rejected() {
        let mut machine = StatusMachine::new();
        machine.begin().unwrap();
        assert_eq!(machine.begin(), Err(DownloadControlError::AlreadyInProgress));
        assert_eq!(machine.current(), DownloadStatus::Downloading);
    }

    #[test]
    fn test_stop_while_idle_rejected() {
        let mut machine = StatusMachine::new();
        assert_eq!(machine.stop(false), Err(DownloadControlError::NotInProgress));

        machine.begin().unwrap();
        machine.finish(Finish::Succeeded);
        assert_eq!(machine.stop(true), Err(DownloadControlError::NotInProgress));
    }

    #[test]
    fn test_stop_transitions() {
        let mut machine = StatusMachine::new();
        machine.begin().unwrap();
        let change = machine.stop(false).unwrap();
        assert_eq!(change.current, DownloadStatus::Cancelled);

        machine.begin().unwrap();
        let change = machine.stop(true).unwrap();
        assert_eq!(change.previous, DownloadStatus::Downloading);
        assert_eq!(change.current, DownloadStatus::Broken);
    }

    #[test]
    fn test_finish_after_stop_is_ignored() {
        let mut machine = StatusMachine::new();
        machine.begin().unwrap();
        machine.stop(false).unwrap();
        assert_eq!(machine.finish(Finish::Succeeded), None);
        assert_eq!(machine.current(), DownloadStatus::Cancelled);
    }

    #[test]
    fn test_restart_from_terminal_states() {
        let mut machine = StatusMachine::new();
        for finish in [Finish::Succeeded, Finish::Failed] {
            machine.begin().unwrap();
            let change = machine.finish(finish).unwrap();
            assert!(change.current.is_terminal());

            let restart = machine.begin().unwrap();
            assert_eq!(restart.previous, change.current);
            assert_eq!(restart.current, DownloadStatus::Downloading);
            machine.stop(false).unwrap();
        }
    }

    #[test]
    fn test_same_status_is_not_a_change() {
        let change = StatusChange {
            previous: DownloadStatus::Cancelled,
            current: DownloadStatus::Cancelled,
        };
        assert!(!change.is_change());
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(DownloadStatus::default(), DownloadStatus::NotStarted);
        assert_eq!(DownloadStatus::Broken.to_string(), "broken");
        assert!(!DownloadStatus::NotStarted.is_terminal());
    }
}
