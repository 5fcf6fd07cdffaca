//! Capture Store: fire-and-forget intake with a single writer
//!
//! Producers call [`CaptureStore::on_event`] and never hear back. Accepted
//! payloads go onto an unbounded channel drained by one blocking worker that
//! owns the [`CollectionStore`], so every read-modify-write cycle runs alone
//! and in arrival order. Overlapping producers cannot clobber each other.
//!
//! Storage failures are logged and counted, never retried and never reported
//! to the producer.

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::backend::KvBackend;
use super::collection::CollectionStore;
use super::event::{CapturedEvent, Disposition};
use crate::config::CaptureLimits;

enum Command {
    Append(Value),
    Flush(oneshot::Sender<()>),
}

/// Producer-side handle; cheap to clone
#[derive(Debug, Clone)]
pub struct CaptureStore {
    tx: mpsc::UnboundedSender<Command>,
    limits: CaptureLimits,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Append(_) => write!(f, "Append"),
            Self::Flush(_) => write!(f, "Flush"),
        }
    }
}

/// Local outcome of routing one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intake {
    /// Handed to the writer
    Queued,
    /// Unrecognized tag
    Ignored,
    /// Failed boundary validation
    Rejected,
    /// Writer already stopped
    Dropped,
}

/// Outcome counters returned when the writer stops
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriterStats {
    /// Payloads written successfully
    pub appended: usize,
    /// Payloads lost to storage errors
    pub failed: usize,
    /// Collection length after the last successful write
    pub total: Option<usize>,
}

/// Final state handed back by [`WriterHandle::shutdown`]
#[derive(Debug)]
pub struct WriterReport<B: KvBackend> {
    pub stats: WriterStats,
    pub collection: CollectionStore<B>,
}

/// Owner-side handle used to wait for the writer to finish
#[derive(Debug)]
pub struct WriterHandle<B: KvBackend> {
    join: JoinHandle<WriterReport<B>>,
}

impl CaptureStore {
    /// Start the writer for `collection` on the current tokio runtime
    pub fn spawn<B: KvBackend>(
        collection: CollectionStore<B>,
        limits: CaptureLimits,
    ) -> (Self, WriterHandle<B>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let join = tokio::task::spawn_blocking(move || run_writer(collection, rx));
        (Self { tx, limits }, WriterHandle { join })
    }

    /// Accept an event from a producer
    ///
    /// Never blocks and never reports back. Unrecognized tags are dropped,
    /// invalid payloads are dropped with a warning.
    pub fn on_event(&self, event: CapturedEvent) {
        let _ = self.dispatch(event);
    }

    /// Route an event and say what happened to it locally
    ///
    /// Only operator tooling looks at the outcome; producers go through
    /// [`CaptureStore::on_event`].
    pub fn dispatch(&self, event: CapturedEvent) -> Intake {
        match event.classify(&self.limits) {
            Disposition::Accepted(payload) => {
                if self.tx.send(Command::Append(payload)).is_err() {
                    tracing::warn!("capture writer has stopped; dropping collected data");
                    return Intake::Dropped;
                }
                Intake::Queued
            }
            Disposition::Ignored(kind) => {
                tracing::debug!(kind = %kind, "ignoring event");
                Intake::Ignored
            }
            Disposition::Rejected(err) => {
                tracing::warn!(error = %err, "rejecting collected data");
                Intake::Rejected
            }
        }
    }

    /// Wait until everything queued before this call has been applied
    ///
    /// Returns immediately if the writer is gone.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

impl<B: KvBackend> WriterHandle<B> {
    /// Wait for the writer to drain its queue and stop
    ///
    /// The writer stops once every [`CaptureStore`] clone has been dropped.
    pub async fn shutdown(self) -> anyhow::Result<WriterReport<B>> {
        let report = self.join.await?;
        Ok(report)
    }
}

fn run_writer<B: KvBackend>(
    mut collection: CollectionStore<B>,
    mut rx: mpsc::UnboundedReceiver<Command>,
) -> WriterReport<B> {
    let mut stats = WriterStats::default();

    while let Some(command) = rx.blocking_recv() {
        match command {
            Command::Append(payload) => match collection.append(payload) {
                Ok(total) => {
                    stats.appended += 1;
                    stats.total = Some(total);
                    tracing::info!(total_stored = total, "collected data received");
                }
                Err(err) => {
                    stats.failed += 1;
                    tracing::error!(key = collection.key(), error = %err, "failed to store collected data");
                }
            },
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    tracing::debug!(
        appended = stats.appended,
        failed = stats.failed,
        "capture writer stopped"
    );
    WriterReport { stats, collection }
}
