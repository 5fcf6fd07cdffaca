//! Stats command - Show storage statistics for the collection

use anyhow::Result;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::utils;

/// Storage statistics for the collection
#[derive(Debug, Default)]
pub struct Stats {
    /// Store database path
    pub store_path: PathBuf,

    /// Number of stored entries
    pub entries: usize,

    /// Number of distinct payloads
    pub unique: usize,

    /// Size of the store database in bytes
    pub db_size: u64,

    /// Size of the stored payloads as compact JSON
    pub payload_bytes: u64,

    /// When the store database was last written
    pub modified: Option<SystemTime>,
}

impl Stats {
    /// Entries that repeat an earlier payload
    pub fn duplicates(&self) -> usize {
        self.entries - self.unique
    }
}

/// Get storage statistics for the store at `db_path`
pub fn stats(db_path: &Path) -> Result<Stats> {
    let items = utils::read_collection(db_path)?;
    let (db_size, modified) = utils::file_info(db_path);

    let mut stats = summarize(&items);
    stats.store_path = db_path.to_path_buf();
    stats.db_size = db_size;
    stats.modified = modified;
    Ok(stats)
}

fn summarize(items: &[Value]) -> Stats {
    let unique: HashSet<String> = items.iter().map(utils::fingerprint).collect();
    let payload_bytes = items
        .iter()
        .map(|v| crate::capture::event::payload_size(v) as u64)
        .sum();

    Stats {
        entries: items.len(),
        unique: unique.len(),
        payload_bytes,
        ..Default::default()
    }
}

/// Format stats for display
pub fn format_stats(stats: &Stats) -> String {
    let mut lines = vec![];

    lines.push(format!("Store: {}", stats.store_path.display()));
    lines.push(format!("Last Modified: {}", utils::format_time(stats.modified)));

    lines.push(String::new()); // blank line

    lines.push(format!("Entries: {}", stats.entries));
    lines.push(format!("Unique Payloads: {}", stats.unique));
    lines.push(format!("Duplicates: {}", stats.duplicates()));
    lines.push(format!(
        "Payload Data: {}",
        utils::format_size(stats.payload_bytes)
    ));
    lines.push(format!(
        "Database Size: {}",
        utils::format_size(stats.db_size)
    ));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{KvBackend, SqliteBackend};
    use crate::config::STORAGE_KEY;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_stats_default() {
        let stats = Stats::default();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.duplicates(), 0);
        assert_eq!(stats.db_size, 0);
    }

    #[test]
    fn test_summarize_counts_duplicates() {
        let stats = summarize(&[
            json!({"url": "a.com"}),
            json!({"url": "b.com"}),
            json!({"url": "a.com"}),
        ]);
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.unique, 2);
        assert_eq!(stats.duplicates(), 1);
        assert_eq!(stats.payload_bytes, 3 * r#"{"url":"a.com"}"#.len() as u64);
    }

    #[test]
    fn test_stats_on_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.sqlite");
        let mut backend = SqliteBackend::open(&path).unwrap();
        backend.set(STORAGE_KEY, &json!([1, 1, 2])).unwrap();
        drop(backend);

        let stats = stats(&path).unwrap();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.unique, 2);
        assert!(stats.db_size > 0);
        assert!(stats.modified.is_some());

        let text = format_stats(&stats);
        assert!(text.contains("Entries: 3"));
        assert!(text.contains("Duplicates: 1"));
    }

    #[test]
    fn test_stats_missing_store() {
        let dir = tempdir().unwrap();
        let stats = stats(&dir.path().join("absent.sqlite")).unwrap();
        assert_eq!(stats.entries, 0);
        assert!(stats.modified.is_none());
    }
}
