//! Backend contract for the hierarchical parameter store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("parameter {0} not found")]
    NotFound(String),
    #[error("parameter store request failed: {0}")]
    Backend(String),
}

/// Key/value operations against the backend. Keys are `/`-delimited
/// hierarchical strings; values are opaque UTF-8 strings. Implementations
/// are shared by reference across the whole vault tree and must be safe to
/// call from concurrent workers. Retry/backoff for transient throttling is
/// the implementation's responsibility, not the caller's.
pub trait ParameterStore: Send + Sync {
    fn get(&self, key: &str) -> Result<String, StoreError>;

    /// Always overwrites. `encryption_key` selects a server-side
    /// encryption key where the backend supports one.
    fn put(&self, key: &str, value: &str, encryption_key: Option<&str>) -> Result<(), StoreError>;

    /// Returns [`StoreError::NotFound`] for an absent key; callers decide
    /// whether that counts as success.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Recursive prefix listing, aggregated across backend pages.
    fn list_by_prefix(&self, prefix: &str) -> Result<HashMap<String, String>, StoreError>;
}

/// In-memory [`ParameterStore`] used by tests and offline experiments.
/// Strongly consistent, with operation counters so tests can assert how
/// many backend calls an operation performed.
#[derive(Default)]
pub struct MemoryStore {
    parameters: Mutex<HashMap<String, String>>,
    gets: AtomicUsize,
    puts: AtomicUsize,
    deletes: AtomicUsize,
    lists: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn list_count(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.parameters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ParameterStore for MemoryStore {
    fn get(&self, key: &str) -> Result<String, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.lock()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, value: &str, _encryption_key: Option<&str>) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        match self.lock().remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    fn list_by_prefix(&self, prefix: &str) -> Result<HashMap<String, String>, StoreError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .lock()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
