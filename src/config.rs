//! Platform-specific configuration and paths

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Namespaced key the collection is persisted under
pub const STORAGE_KEY: &str = "fluxCollections";

/// File name of the store database inside the data directory
pub const STORE_FILE_NAME: &str = "state.sqlite";

/// Default upper bound on a single serialized payload (1 MiB)
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Get the application data directory
/// - macOS: ~/Library/Application Support/flux-capture/
/// - Linux: ~/.local/share/flux-capture/ (or $XDG_DATA_HOME/flux-capture/)
/// - Windows: %APPDATA%/flux-capture/
pub fn data_dir() -> Result<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home
            .join("Library")
            .join("Application Support")
            .join("flux-capture"))
    }

    #[cfg(target_os = "linux")]
    {
        let data = dirs::data_dir().context("Could not determine data directory")?;
        Ok(data.join("flux-capture"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata = dirs::config_dir().context("Could not determine AppData directory")?;
        Ok(appdata.join("flux-capture"))
    }
}

/// Get the default store database path (`<data_dir>/state.sqlite`)
pub fn default_store_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(STORE_FILE_NAME))
}

/// Resolve the store path, preferring an explicit override
pub fn resolve_store_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => default_store_path(),
    }
}

/// Limits applied to inbound events at the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureLimits {
    /// Largest accepted payload, measured as compact JSON
    pub max_payload_bytes: usize,
}

impl Default for CaptureLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}
