//! Export command - Write the collection to JSON or NDJSON
//!
//! `ndjson` writes bare payloads for other tools; `events` wraps each one in
//! a `COLLECT_DATA` envelope so the output can be fed back through `ingest`.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

use super::utils;
use crate::capture::CapturedEvent;

/// Output format for export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// A single pretty-printed JSON array
    Json,
    /// One compact payload per line (not readable by `ingest`)
    Ndjson,
    /// One `COLLECT_DATA` event per line, readable by `ingest`
    Events,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "ndjson" | "jsonl" => Some(Self::Ndjson),
            "events" => Some(Self::Events),
            _ => None,
        }
    }
}

/// Execute the export command
///
/// Prints to stdout when `output` is `None`.
pub fn execute(db_path: &Path, format: ExportFormat, output: Option<&str>) -> Result<usize> {
    let items = utils::read_collection(db_path)?;
    let content = render(&items, format)?;

    if let Some(output_path) = output {
        fs::write(output_path, &content)
            .with_context(|| format!("Failed to write: {}", output_path))?;
        println!("Exported {} entries to: {}", items.len(), output_path);
    } else {
        println!("{}", content);
    }

    Ok(items.len())
}

/// Serialize entries in the requested format
pub fn render(items: &[Value], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(items)?),
        ExportFormat::Ndjson => {
            let lines = items
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(lines.join("\n"))
        }
        ExportFormat::Events => {
            let lines = items
                .iter()
                .map(|item| serde_json::to_string(&CapturedEvent::collect(item.clone())))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(lines.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_format_from_str() {
        assert_eq!(ExportFormat::from_str("JSON"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::from_str("jsonl"), Some(ExportFormat::Ndjson));
        assert_eq!(ExportFormat::from_str("events"), Some(ExportFormat::Events));
        assert_eq!(ExportFormat::from_str("csv"), None);
    }

    #[test]
    fn test_render_ndjson() {
        let items = vec![json!({"url": "a.com"}), json!({"url": "b.com"})];
        let output = render(&items, ExportFormat::Ndjson).unwrap();
        assert_eq!(output, "{\"url\":\"a.com\"}\n{\"url\":\"b.com\"}");
    }

    #[test]
    fn test_render_events_wraps_payloads() {
        let items = vec![json!({"url": "a.com"})];
        let output = render(&items, ExportFormat::Events).unwrap();
        assert_eq!(
            output,
            "{\"type\":\"COLLECT_DATA\",\"payload\":{\"url\":\"a.com\"}}"
        );
    }

    #[tokio::test]
    async fn test_events_export_feeds_back_into_ingest() {
        use crate::capture::{CaptureStore, CollectionStore, MemoryBackend};
        use crate::commands::ingest;
        use crate::config::{CaptureLimits, STORAGE_KEY};
        use std::io::Cursor;

        let items = vec![json!({"url": "a.com"}), json!(null), json!([1, 2]), json!("text")];

        // Bare payloads are not events
        let bare = render(&items, ExportFormat::Ndjson).unwrap();
        let collection = CollectionStore::new(MemoryBackend::new(), STORAGE_KEY);
        let (store, writer) = CaptureStore::spawn(collection, CaptureLimits::default());
        let summary = ingest::feed(Cursor::new(bare), &store).unwrap();
        drop(store);
        writer.shutdown().await.unwrap();
        assert_eq!(summary.accepted, 0);

        let events = render(&items, ExportFormat::Events).unwrap();
        let collection = CollectionStore::new(MemoryBackend::new(), STORAGE_KEY);
        let (store, writer) = CaptureStore::spawn(collection, CaptureLimits::default());
        let summary = ingest::feed(Cursor::new(events), &store).unwrap();
        drop(store);
        let report = writer.shutdown().await.unwrap();

        assert_eq!(summary.accepted, items.len());
        assert_eq!(report.collection.read().unwrap(), items);
    }

    #[test]
    fn test_render_json_is_array() {
        let items = vec![json!(1), json!("two")];
        let output = render(&items, ExportFormat::Json).unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed, json!([1, "two"]));
    }

    #[test]
    fn test_execute_to_file_from_missing_store() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out.json");
        let count = execute(
            &dir.path().join("absent.sqlite"),
            ExportFormat::Json,
            Some(&out.to_string_lossy()),
        )
        .unwrap();
        assert_eq!(count, 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "[]");
    }
}
