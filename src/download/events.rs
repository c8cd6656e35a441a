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


//! Download events and handler dispatch
//!
//! Handlers are attached while a wrapper is being built and stay bound for
//! its whole life; nothing is re-subscribed per attempt. Events carry the
//! attempt number, so a late `Completed` from a stopped attempt can be told
//! apart from the events of the attempt that replaced it.

use crate::download::progress::{DownloadCompletion, DownloadProgress};
use crate::download::status::StatusChange;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Events raised by a download wrapper
#[derive(Debug, Clone)]
pub enum DownloadEvent<T> {
    /// Raised synchronously by `start_download`, before the request is sent
    Started { attempt: u64 },
    /// One per transport progress tick
    ProgressChanged(DownloadProgress),
    /// Status moved to a different value
    StatusChanged(StatusChange),
    /// Exactly once per attempt
    Completed(DownloadCompletion<T>),
}

impl<T> DownloadEvent<T> {
    pub fn attempt(&self) -> Option<u64> {
        match self {
            DownloadEvent::Started { attempt } => Some(*attempt),
            DownloadEvent::ProgressChanged(progress) => Some(progress.attempt),
            DownloadEvent::StatusChanged(_) => None,
            DownloadEvent::Completed(completion) => Some(completion.attempt),
        }
    }
}

/// Callback type for download events
pub type EventHandler<T> = Arc<dyn Fn(&DownloadEvent<T>) + Send + Sync>;

/// Handler that forwards every event into an unbounded channel
pub fn channel<T>() -> (EventHandler<T>, mpsc::UnboundedReceiver<DownloadEvent<T>>)
where
    T: Clone + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let handler: EventHandler<T> = Arc::new(move |event: &DownloadEvent<T>| {
        // Receiver dropped means nobody is listening any more
        let _ = tx.send(event.clone());
    });
    (handler, rx)
}

/// Fan-out to the handlers bound to one wrapper
pub(crate) struct Emitter<T> {
    handlers: Arc<Vec<EventHandler<T>>>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
        }
    }
}

impl<T> Emitter<T> {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Bind another handler; attempts already running keep their handler set
    pub fn add(&mut self, handler: EventHandler<T>) {
        Arc::make_mut(&mut self.handlers).push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn emit(&self, event: &DownloadEvent<T>) {
        for handler in self.handlers.iter() {
            handler(event);
        }
    }
}
