//! CLI commands

pub mod backup;
pub mod export;
pub mod ingest;
pub mod list;
pub mod restore;
pub mod stats;
pub mod utils;
