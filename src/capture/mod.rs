//! Core capture operations

pub mod backend;
pub mod collection;
pub mod event;
pub mod store;

// Re-exports for library consumers
#[allow(unused_imports)]
pub use backend::{KvBackend, MemoryBackend, SqliteBackend, StorageError};
#[allow(unused_imports)]
pub use collection::{Capacity, CollectionStore};
#[allow(unused_imports)]
pub use event::{CapturedEvent, Disposition, EventError, COLLECT_DATA};
#[allow(unused_imports)]
pub use store::{CaptureStore, Intake, WriterHandle, WriterReport, WriterStats};
