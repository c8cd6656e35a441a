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


//! Shared transfer engine behind the File/String/Data downloaders
//!
//! # Attempt Flow
//! 1. `start`: status → Downloading, emit `StatusChanged` and `Started`,
//!    spawn the attempt on the current tokio runtime
//! 2. Size probe (HEAD / stat) seeds the calculator
//! 3. Transfer request; its reported size patches the calculator
//! 4. One `ProgressChanged` per chunk
//! 5. Partial-file cleanup, then status → Completed / Broken (unless a
//!    stop already chose) with its `StatusChanged`, then exactly one
//!    `Completed`
//!
//! `stop` flips the status right away and signals the attempt through a
//! oneshot channel; the attempt drops its in-flight request and reports
//! `Completed` with `was_cancelled = true` on its own time.
//!
//! State shared between the caller and the attempt lives behind a
//! `std::sync::Mutex` that is never held across an await or while handlers
//! run.

use crate::config::DownloaderConfig;
use crate::download::calculator::DownloadTimeCalculator;
use crate::download::events::{DownloadEvent, Emitter, EventHandler};
use crate::download::progress::{DownloadCompletion, DownloadProgress};
use crate::download::sink::{discard_partial, Sink, SinkSpec};
use crate::download::source::{Credentials, Source};
use crate::download::status::{DownloadStatus, Finish, StatusChange, StatusMachine};
use crate::error::{DownloadControlError, DownloadError, Result};
use chrono::Utc;
use futures_util::StreamExt;
use log::{debug, info, warn};
use reqwest::Client;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use uuid::Uuid;

/// What a downloader variant produces
pub(crate) trait TransferKind: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    fn sink_spec(&self) -> SinkSpec;

    /// Turn the finished sink's buffer into the variant's result
    fn finish(&self, buffered: Vec<u8>) -> Result<Self::Output>;
}

#[derive(Debug, Default)]
struct SharedState {
    status: StatusMachine,

    /// Number of the most recent attempt (0 before the first start)
    attempt: u64,

    /// Stop signal for the running attempt
    cancel_tx: Option<oneshot::Sender<()>>,

    last_progress: Option<DownloadProgress>,
}

fn lock(shared: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct Transfer<K: TransferKind> {
    id: Uuid,
    source: Source,
    kind: Arc<K>,
    client: Client,
    config: Arc<DownloaderConfig>,
    credentials: Option<Credentials>,
    user_state: Option<String>,
    emitter: Emitter<K::Output>,
    shared: Arc<Mutex<SharedState>>,
}

impl<K: TransferKind> Transfer<K> {
    pub fn new(url: &str, kind: K) -> Result<Self> {
        let source = Source::parse(url)?;
        let client = Client::builder().build()?;

        Ok(Self {
            id: Uuid::new_v4(),
            source,
            kind: Arc::new(kind),
            client,
            config: Arc::new(DownloaderConfig::default()),
            credentials: None,
            user_state: None,
            emitter: Emitter::new(),
            shared: Arc::new(Mutex::new(SharedState::default())),
        })
    }

    pub fn set_config(&mut self, config: DownloaderConfig) -> Result<()> {
        config.validate()?;
        self.config = Arc::new(config);
        Ok(())
    }

    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
    }

    pub fn set_user_state(&mut self, user_state: String) {
        self.user_state = Some(user_state);
    }

    pub fn add_handler(&mut self, handler: EventHandler<K::Output>) {
        self.emitter.add(handler);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn status(&self) -> DownloadStatus {
        lock(&self.shared).status.current()
    }

    pub fn is_busy(&self) -> bool {
        self.status().is_busy()
    }

    pub fn attempt(&self) -> u64 {
        lock(&self.shared).attempt
    }

    pub fn progress(&self) -> Option<DownloadProgress> {
        lock(&self.shared).last_progress.clone()
    }

    pub fn start(&self) -> std::result::Result<(), DownloadControlError> {
        let runtime = Handle::try_current().map_err(|_| DownloadControlError::NoRuntime)?;

        let (change, attempt, cancel_rx) = {
            let mut shared = lock(&self.shared);
            let change = shared.status.begin()?;
            shared.attempt += 1;
            let (cancel_tx, cancel_rx) = oneshot::channel();
            shared.cancel_tx = Some(cancel_tx);
            shared.last_progress = None;
            (change, shared.attempt, cancel_rx)
        };

        info!(
            "[{}] Starting download #{} from {}",
            self.id,
            attempt,
            self.source.as_display()
        );
        emit_status(&self.emitter, change);
        self.emitter.emit(&DownloadEvent::Started { attempt });

        let context = AttemptContext {
            id: self.id,
            attempt,
            source: self.source.clone(),
            kind: Arc::clone(&self.kind),
            client: self.client.clone(),
            config: Arc::clone(&self.config),
            credentials: self.credentials.clone(),
            user_state: self.user_state.clone(),
            emitter: self.emitter.clone(),
            shared: Arc::clone(&self.shared),
        };
        runtime.spawn(context.run(cancel_rx));

        Ok(())
    }

    pub fn stop(&self, mark_as_broken: bool) -> std::result::Result<(), DownloadControlError> {
        let (change, cancel_tx, attempt) = {
            let mut shared = lock(&self.shared);
            let change = shared.status.stop(mark_as_broken)?;
            (change, shared.cancel_tx.take(), shared.attempt)
        };

        if let Some(cancel_tx) = cancel_tx {
            // Attempt already gone if this fails
            let _ = cancel_tx.send(());
        }

        info!(
            "[{}] Stop requested for download #{} ({})",
            self.id, attempt, change.current
        );
        emit_status(&self.emitter, change);
        Ok(())
    }
}

impl<K: TransferKind> Drop for Transfer<K> {
    fn drop(&mut self) {
        if self.is_busy() {
            let _ = self.stop(false);
        }
    }
}

fn emit_status<T>(emitter: &Emitter<T>, change: StatusChange) {
    if change.is_change() {
        emitter.emit(&DownloadEvent::StatusChanged(change));
    }
}

/// Everything one spawned attempt needs
struct AttemptContext<K: TransferKind> {
    id: Uuid,
    attempt: u64,
    source: Source,
    kind: Arc<K>,
    client: Client,
    config: Arc<DownloaderConfig>,
    credentials: Option<Credentials>,
    user_state: Option<String>,
    emitter: Emitter<K::Output>,
    shared: Arc<Mutex<SharedState>>,
}

impl<K: TransferKind> AttemptContext<K> {
    async fn run(self, mut cancel_rx: oneshot::Receiver<()>) {
        let mut calculator =
            DownloadTimeCalculator::starting_at(Instant::now(), None, self.config.speed_window());

        // `None` when the stop signal won the race
        let outcome = tokio::select! {
            result = self.transfer(&mut calculator) => Some(result),
            _ = &mut cancel_rx => None,
        };

        let finished_at = Instant::now();
        let elapsed = calculator.elapsed_at(finished_at);

        let transferred = matches!(outcome, Some(Ok(_)));
        let (mut result, error) = match outcome {
            Some(Ok(buffered)) => match self.kind.finish(buffered) {
                Ok(output) => (Some(output), None),
                Err(e) => (None, Some(e)),
            },
            Some(Err(e)) => (None, Some(e)),
            None => (None, None),
        };

        // Cleanup and sizing happen before the status flips, so nothing can
        // restart between the terminal status and its StatusChanged event
        let spec = self.kind.sink_spec();
        let secs = elapsed.as_secs_f64();
        let average_bytes_per_second = match spec {
            SinkSpec::File(ref destination) => {
                if !transferred {
                    if let Err(e) = discard_partial(destination, self.attempt).await {
                        warn!("[{}] Could not remove partial file: {}", self.id, e);
                    }
                }
                match tokio::fs::metadata(destination).await {
                    Ok(meta) if transferred && secs > 0.0 => meta.len() as f64 / secs,
                    _ => 0.0,
                }
            }
            SinkSpec::Memory => calculator.average_speed_at(finished_at),
        };

        let (was_cancelled, change) = {
            let mut shared = lock(&self.shared);
            if self.is_current(&shared) {
                shared.cancel_tx = None;
                let finish = if error.is_some() {
                    Finish::Failed
                } else {
                    Finish::Succeeded
                };
                (false, shared.status.finish(finish))
            } else {
                (true, None)
            }
        };
        if let Some(change) = change {
            emit_status(&self.emitter, change);
        }

        if was_cancelled {
            result = None;
        }

        match (&error, was_cancelled) {
            (Some(e), _) => warn!("[{}] Download #{} failed: {}", self.id, self.attempt, e),
            (None, true) => info!("[{}] Download #{} cancelled", self.id, self.attempt),
            (None, false) => info!(
                "[{}] Download #{} completed: {} bytes in {:.2}s",
                self.id,
                self.attempt,
                calculator.bytes_received(),
                secs
            ),
        }

        self.emitter.emit(&DownloadEvent::Completed(DownloadCompletion {
            attempt: self.attempt,
            average_bytes_per_second,
            elapsed,
            finished_at: Utc::now(),
            was_cancelled,
            error: error.map(Arc::new),
            user_state: self.user_state.clone(),
            result,
        }));
    }

    async fn transfer(&self, calculator: &mut DownloadTimeCalculator) -> Result<Vec<u8>> {
        if self.config.probe_size {
            let probed = self
                .source
                .probe_size(&self.client, self.credentials.as_ref(), &self.config)
                .await;
            if let Some(total) = probed {
                calculator.set_total_bytes(total);
            }
        }

        let mut body = self
            .source
            .open(&self.client, self.credentials.as_ref(), &self.config)
            .await?;
        if let Some(total) = body.reported_total {
            calculator.set_total_bytes(total);
        }
        debug!(
            "[{}] Download #{} opened, total {:?}",
            self.id,
            self.attempt,
            calculator.total_bytes()
        );

        let mut sink = Sink::open(&self.kind.sink_spec(), self.attempt).await?;
        let mut received = 0u64;

        while let Some(chunk) = body.chunks.next().await {
            let chunk = chunk?;
            sink.write(&chunk).await?;
            received += chunk.len() as u64;

            calculator.update_download_times_at(received, Instant::now());
            self.report_progress(calculator);
        }

        if let Some(expected) = body.reported_total {
            if received < expected {
                return Err(DownloadError::IncompleteTransfer { expected, received });
            }
        }

        sink.finish().await
    }

    fn report_progress(&self, calculator: &DownloadTimeCalculator) {
        let progress = calculator.progress(self.attempt);
        {
            let mut shared = lock(&self.shared);
            if !self.is_current(&shared) {
                return;
            }
            shared.last_progress = Some(progress.clone());
        }
        self.emitter.emit(&DownloadEvent::ProgressChanged(progress));
    }

    /// Still the wrapper's running attempt (not stopped, not superseded)
    fn is_current(&self, shared: &SharedState) -> bool {
        shared.attempt == self.attempt && shared.status.current().is_busy()
    }
}
