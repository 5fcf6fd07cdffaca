//! The persisted collection of captured payloads
//!
//! The collection is a JSON array stored under one key. Appends are a plain
//! read-modify-write against the backend: read the array (absent means
//! empty), push, write the whole array back. This is only safe when a single
//! writer owns the collection; see [`super::store`].

use serde_json::Value;
use std::num::NonZeroUsize;

use super::backend::{KvBackend, StorageError};

/// Retention policy for the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capacity {
    /// Never remove entries
    #[default]
    Unbounded,
    /// Keep only the newest `n` entries
    Ring(NonZeroUsize),
}

impl Capacity {
    /// `Some(n)` becomes a ring of `n`, `None` is unbounded
    pub fn from_limit(limit: Option<NonZeroUsize>) -> Self {
        match limit {
            Some(n) => Self::Ring(n),
            None => Self::Unbounded,
        }
    }
}

/// An ordered, append-only sequence of payloads stored under `key`
#[derive(Debug)]
pub struct CollectionStore<B: KvBackend> {
    backend: B,
    key: String,
    capacity: Capacity,
}

impl<B: KvBackend> CollectionStore<B> {
    pub fn new(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            capacity: Capacity::Unbounded,
        }
    }

    pub fn with_capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Read the current sequence; an absent key reads as empty
    pub fn read(&self) -> Result<Vec<Value>, StorageError> {
        match self.backend.get_or(&self.key, Value::Array(Vec::new()))? {
            Value::Array(items) => Ok(items),
            other => Err(StorageError::Corrupt {
                key: self.key.clone(),
                reason: format!("expected an array, found {}", json_kind(&other)),
            }),
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    /// Append one payload and write the sequence back, returning the new length
    pub fn append(&mut self, payload: Value) -> Result<usize, StorageError> {
        let mut items = self.read()?;
        items.push(payload);

        if let Capacity::Ring(limit) = self.capacity {
            let limit = limit.get();
            if items.len() > limit {
                let excess = items.len() - limit;
                items.drain(..excess);
            }
        }

        let total = items.len();
        self.backend.set(&self.key, &Value::Array(items))?;
        Ok(total)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
