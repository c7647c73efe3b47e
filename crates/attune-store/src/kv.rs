//! Key-value persistence surface.
//!
//! String keys mapped to JSON payloads, one file per key on disk. Stored
//! shapes carry no migration support, so reads go through a
//! decode-with-fallback contract: malformed payloads degrade to defaults
//! with a logged warning instead of propagating an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use tracing::warn;

use attune_core::error::{AttuneError, Result};

/// Durable string-key / JSON-value storage.
pub trait KvStore: Send + Sync {
    /// Read the raw JSON payload stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write the raw JSON payload under `key`, replacing any previous value.
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the value stored under `key`. Removing a missing key is a no-op.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Decode a stored payload, degrading to the default on failure.
///
/// A missing value or an unparseable one both produce `T::default()`;
/// the parse failure is reported as a warning, never as an error.
pub fn decode_or_default<T: DeserializeOwned + Default>(key: &str, raw: Option<String>) -> T {
    match raw {
        None => T::default(),
        Some(payload) => match serde_json::from_str(&payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Discarding malformed stored payload");
                T::default()
            }
        },
    }
}

// =============================================================================
// FileKvStore
// =============================================================================

/// File-backed store: one `<key>.json` file per key under a data directory.
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    /// Open (or create) a store rooted at the given directory.
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| AttuneError::Storage(format!("Failed to create data dir: {}", e)))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are internal constants, but keep the file name safe anyway.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AttuneError::Storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        std::fs::write(&path, value).map_err(|e| {
            AttuneError::Storage(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AttuneError::Storage(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

// =============================================================================
// MemoryKvStore
// =============================================================================

/// In-memory store used by tests and as the degraded-mode fallback.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
