//! Ingest command - Feed NDJSON capture events into the store

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::capture::{
    Capacity, CaptureStore, CapturedEvent, CollectionStore, Intake, SqliteBackend, WriterStats,
};
use crate::config::{CaptureLimits, STORAGE_KEY};

/// Ingest options
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Retention policy for the collection
    pub capacity: Capacity,
    /// Boundary limits for payloads
    pub limits: CaptureLimits,
}

/// What happened to the input
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    /// Non-blank lines read
    pub lines: usize,
    /// Events handed to the writer
    pub accepted: usize,
    /// Events with an unrecognized tag
    pub ignored: usize,
    /// Events refused at the boundary
    pub rejected: usize,
    /// Lines that were not valid events
    pub malformed: usize,
    /// Accepted events that never reached storage
    pub failed: usize,
    /// Collection length afterwards
    pub total: usize,
}

impl IngestSummary {
    /// Fold in the writer's outcome; events dropped before reaching it stay counted
    pub fn record_writer(&mut self, stats: &WriterStats) {
        self.failed += stats.failed;
    }
}

/// Execute the ingest command
///
/// Reads from `input`, or stdin when `None`.
pub async fn execute(
    db_path: &Path,
    input: Option<&str>,
    options: IngestOptions,
) -> Result<IngestSummary> {
    let backend = SqliteBackend::open(db_path)
        .with_context(|| format!("Failed to open store: {}", db_path.display()))?;
    let collection = CollectionStore::new(backend, STORAGE_KEY).with_capacity(options.capacity);

    let (store, writer) = CaptureStore::spawn(collection, options.limits);

    // Blocking reads run off the runtime workers
    let input = input.map(str::to_owned);
    let feeder = store.clone();
    let fed = tokio::task::spawn_blocking(move || match input {
        Some(path) => {
            let file = File::open(&path).with_context(|| format!("Failed to open: {}", path))?;
            feed(BufReader::new(file), &feeder)
        }
        None => feed(io::stdin().lock(), &feeder),
    })
    .await
    .context("Input reader panicked")?;

    drop(store);
    let report = writer.shutdown().await.context("Capture writer panicked")?;

    let mut summary = fed?;
    summary.record_writer(&report.stats);
    summary.total = report
        .collection
        .len()
        .with_context(|| format!("Failed to read back {}", STORAGE_KEY))?;

    Ok(summary)
}

/// Dispatch every line of `reader` as an event
pub fn feed<R: BufRead>(reader: R, store: &CaptureStore) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        summary.lines += 1;

        let event = match CapturedEvent::parse_line(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "skipping malformed event");
                summary.malformed += 1;
                continue;
            }
        };

        match store.dispatch(event) {
            Intake::Queued => summary.accepted += 1,
            Intake::Ignored => summary.ignored += 1,
            Intake::Rejected => summary.rejected += 1,
            Intake::Dropped => summary.failed += 1,
        }
    }

    Ok(summary)
}

/// Format an ingest summary for display
pub fn format_summary(summary: &IngestSummary) -> String {
    let mut lines = vec![];

    lines.push(format!("Lines read: {}", summary.lines));
    lines.push(format!("Accepted: {}", summary.accepted.to_string().green()));
    lines.push(format!("Ignored: {}", summary.ignored));

    if summary.rejected > 0 {
        lines.push(format!("Rejected: {}", summary.rejected.to_string().yellow()));
    }
    if summary.malformed > 0 {
        lines.push(format!("Malformed: {}", summary.malformed.to_string().yellow()));
    }
    if summary.failed > 0 {
        lines.push(format!("Failed writes: {}", summary.failed.to_string().red()));
    }

    lines.push(String::new());
    lines.push(format!("Total stored: {}", summary.total));

    lines.join("\n")
}
