//! Backup command - Archive the store database

use anyhow::{bail, Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use owo_colors::OwoColorize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tar::Builder;

use super::utils;
use crate::capture::{CollectionStore, SqliteBackend};
use crate::config::{STORAGE_KEY, STORE_FILE_NAME};

/// Current backup format version
pub const BACKUP_VERSION: u32 = 1;

/// Backup metadata
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct BackupManifest {
    /// Version of the backup format
    pub version: u32,
    /// Store path the backup was taken from
    pub source_path: String,
    /// Key the collection lives under
    pub storage_key: String,
    /// Number of entries at backup time
    pub entries: usize,
    /// Timestamp of backup creation
    pub created_at: i64,
}

/// Execute the backup command, returning the archive path
pub fn execute(db_path: &Path, backup_file: &str) -> Result<PathBuf> {
    if !db_path.exists() {
        bail!("No store found at: {}", db_path.display());
    }

    let backend = SqliteBackend::open(db_path)
        .with_context(|| format!("Failed to open: {}", db_path.display()))?;
    let collection = CollectionStore::new(backend, STORAGE_KEY);
    let entries = collection.len().context("Failed to read collection")?;

    println!("Creating backup of: {}", db_path.display());
    println!("  Entries: {}", entries);
    println!();

    let manifest = BackupManifest {
        version: BACKUP_VERSION,
        source_path: db_path.to_string_lossy().to_string(),
        storage_key: STORAGE_KEY.to_string(),
        entries,
        created_at: chrono::Utc::now().timestamp(),
    };

    // VACUUM INTO yields a consistent copy even with a live writer
    let temp_dir = tempfile::tempdir().context("Failed to create temp directory")?;
    let snapshot_path = temp_dir.path().join(STORE_FILE_NAME);
    collection
        .backend()
        .snapshot_to(&snapshot_path)
        .context("Failed to snapshot store")?;

    let backup_path = if backup_file.ends_with(".tar.gz") {
        PathBuf::from(backup_file)
    } else {
        PathBuf::from(format!("{}.tar.gz", backup_file))
    };

    let file = File::create(&backup_path)
        .with_context(|| format!("Failed to create: {}", backup_path.display()))?;

    let encoder = GzEncoder::new(file, Compression::default());
    let mut archive = Builder::new(encoder);

    let manifest_json = serde_json::to_string_pretty(&manifest)?;
    add_file_to_archive(&mut archive, "manifest.json", manifest_json.as_bytes())?;
    archive
        .append_path_with_name(&snapshot_path, STORE_FILE_NAME)
        .context("Failed to add store snapshot")?;

    let encoder = archive.into_inner()?;
    encoder.finish()?;

    let size = fs::metadata(&backup_path)?.len();

    println!(
        "{} {} ({})",
        "Created:".green(),
        backup_path.display(),
        utils::format_size(size)
    );

    Ok(backup_path)
}

/// Add a file with content to the archive
fn add_file_to_archive<W: Write>(
    archive: &mut Builder<W>,
    name: &str,
    content: &[u8],
) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(chrono::Utc::now().timestamp().max(0) as u64);
    header.set_cksum();

    archive.append_data(&mut header, name, content)?;
    Ok(())
}
