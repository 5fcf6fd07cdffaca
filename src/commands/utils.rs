//! Shared utilities for commands

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::capture::{CollectionStore, SqliteBackend};
use crate::config::STORAGE_KEY;

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a modification time as `YYYY-MM-DD HH:MM` (UTC)
pub fn format_time(time: Option<SystemTime>) -> String {
    time.and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| {
            let dt = chrono::DateTime::from_timestamp(d.as_secs() as i64, 0).unwrap_or_default();
            dt.format("%Y-%m-%d %H:%M").to_string()
        })
        .unwrap_or_else(|| "-".to_string())
}

/// Read the collection from a store database without modifying it
///
/// A missing database reads as an empty collection.
pub fn read_collection(db_path: &Path) -> Result<Vec<Value>> {
    if !db_path.exists() {
        return Ok(Vec::new());
    }

    let backend = SqliteBackend::open_read_only(db_path)
        .with_context(|| format!("Failed to open: {}", db_path.display()))?;
    let collection = CollectionStore::new(backend, STORAGE_KEY);
    collection
        .read()
        .with_context(|| format!("Failed to read {} from {}", STORAGE_KEY, db_path.display()))
}

/// Size and modification time of a file, if it exists
pub fn file_info(path: &Path) -> (u64, Option<SystemTime>) {
    match fs::metadata(path) {
        Ok(metadata) => (metadata.len(), metadata.modified().ok()),
        Err(_) => (0, None),
    }
}

/// Stable fingerprint of a payload (md5 of its compact JSON)
///
/// serde_json keeps object keys sorted, so equal payloads hash equally.
pub fn fingerprint(payload: &Value) -> String {
    let bytes = serde_json::to_vec(payload).unwrap_or_default();
    format!("{:x}", md5::compute(bytes))
}

/// One-line summary of a payload for tables
///
/// Objects with a string `url` field show the url; anything else shows its
/// compact JSON, truncated to `max_chars`.
pub fn summarize(payload: &Value, max_chars: usize) -> String {
    if let Some(url) = payload.get("url").and_then(|v| v.as_str()) {
        return truncate(url, max_chars);
    }
    let compact = serde_json::to_string(payload).unwrap_or_default();
    truncate(&compact, max_chars)
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}
