//! Restore command - Install a store database from a backup

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use owo_colors::OwoColorize;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::Archive;

use super::backup::{BackupManifest, BACKUP_VERSION};
use super::utils;
use crate::capture::{CollectionStore, SqliteBackend};
use crate::config::STORE_FILE_NAME;

/// Execute the restore command, returning the number of restored entries
///
/// Refuses to replace a store that already holds entries unless `force`.
pub fn execute(backup_file: &str, db_path: &Path, force: bool) -> Result<usize> {
    let backup_path = PathBuf::from(backup_file);

    if !backup_path.exists() {
        bail!("Backup file does not exist: {}", backup_path.display());
    }

    let manifest = read_manifest(&backup_path)?;
    if manifest.version > BACKUP_VERSION {
        bail!(
            "Backup format version {} is newer than supported ({})",
            manifest.version,
            BACKUP_VERSION
        );
    }

    println!("Restoring backup:");
    println!("  Original store: {}", manifest.source_path);
    println!("  Entries: {}", manifest.entries);
    println!("  Created: {}", format_created(manifest.created_at));
    println!();

    match utils::read_collection(db_path) {
        Ok(existing) if existing.is_empty() => {}
        Ok(existing) => {
            if !force {
                bail!(
                    "Store at {} already holds {} entries; use --force to replace it",
                    db_path.display(),
                    existing.len()
                );
            }
            println!(
                "{} replacing {} existing entries",
                "Warning:".yellow(),
                existing.len()
            );
        }
        // An unreadable store can only be replaced on request
        Err(e) if force => {
            tracing::warn!(store = %db_path.display(), error = %e, "replacing unreadable store");
            println!("{} replacing unreadable store: {}", "Warning:".yellow(), e);
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!(
                    "Failed to inspect: {} (use --force to replace it)",
                    db_path.display()
                )
            });
        }
    }

    println!("Extracting backup...");

    let file = File::open(&backup_path)
        .with_context(|| format!("Failed to open: {}", backup_path.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let temp_dir = tempfile::tempdir().context("Failed to create temp directory")?;
    archive
        .unpack(temp_dir.path())
        .context("Failed to extract backup")?;

    let extracted = temp_dir.path().join(STORE_FILE_NAME);
    if !extracted.exists() {
        bail!("Backup archive does not contain {}", STORE_FILE_NAME);
    }

    // Make sure the snapshot is readable before it replaces anything
    let restored = {
        let backend = SqliteBackend::open_read_only(&extracted)
            .context("Backup contains an unreadable store")?;
        CollectionStore::new(backend, manifest.storage_key.as_str())
            .len()
            .context("Backup contains a corrupt collection")?
    };

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::copy(&extracted, db_path)
        .with_context(|| format!("Failed to write: {}", db_path.display()))?;

    println!("  -> {}", db_path.display());
    println!();
    println!("{}", "Restore complete!".green());

    Ok(restored)
}

fn format_created(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Read manifest from a backup archive
fn read_manifest(backup_path: &Path) -> Result<BackupManifest> {
    let file = File::open(backup_path)
        .with_context(|| format!("Failed to open: {}", backup_path.display()))?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?;

        if path.to_string_lossy() == "manifest.json" {
            let mut content = String::new();
            entry.read_to_string(&mut content)?;
            let manifest: BackupManifest =
                serde_json::from_str(&content).context("Failed to parse manifest.json")?;
            return Ok(manifest);
        }
    }

    bail!("Backup archive does not contain manifest.json")
}
