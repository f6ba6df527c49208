//! Key-value persistence adapters.
//!
//! # Storage layout (file backend)
//!
//! ```text
//! ~/.tabgroup/               (mode 0700)
//!   storage.json             (mode 0600)
//! ```
//!
//! `storage.json` holds `{"saved_at": "<rfc3339>", "entries": {"<key>": <json>}}`.
//! A bare `{"<key>": <json>}` map is accepted on read and rewritten in the
//! structured form on the next save.
//!
//! # API pattern
//!
//! Path helpers come in two forms, as everywhere else in this crate:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use crate::error::{io_err, StorageError};

/// Async key-value store over string keys and JSON values.
///
/// Keys that have never been written are absent from `get_many` results;
/// callers decide what "absent" means.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Batched read. Missing keys are omitted from the returned map.
    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StorageError>;

    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let mut found = self.get_many(&[key]).await?;
        Ok(found.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// 1. In-memory backend
// ---------------------------------------------------------------------------

/// Process-local storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded storage, e.g. to simulate an existing installation.
    pub fn with_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            entries: Arc::new(RwLock::new(map)),
        }
    }

    /// Copy of every stored entry.
    pub async fn entries(&self) -> HashMap<String, Value> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StorageError> {
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(*key).map(|v| ((*key).to_owned(), v.clone())))
            .collect())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.entries.write().await.insert(key.to_owned(), value);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 2. File backend
// ---------------------------------------------------------------------------

/// On-disk storage payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageDocument {
    pub saved_at: DateTime<Utc>,
    pub entries: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StorageDocumentCompat {
    Structured(StorageDocumentStructuredCompat),
    Bare(BTreeMap<String, Value>),
}

#[derive(Debug, Deserialize)]
struct StorageDocumentStructuredCompat {
    saved_at: Option<DateTime<Utc>>,
    entries: BTreeMap<String, Value>,
}

/// `<home>/.tabgroup/storage.json`. Pure, no I/O.
pub fn storage_path_at(home: &Path) -> PathBuf {
    home.join(".tabgroup").join("storage.json")
}

/// `storage_path_at` convenience wrapper.
pub fn storage_path() -> Result<PathBuf, StorageError> {
    Ok(storage_path_at(&home()?))
}

/// JSON-document storage. Every `set` rewrites the whole document atomically;
/// concurrent `set`s on one instance (and its clones) are serialized.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonFileStorage {
    /// Storage rooted at an explicit home directory.
    pub fn at(home: &Path) -> Self {
        Self {
            path: storage_path_at(home),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Storage rooted at `dirs::home_dir()`.
    pub fn open() -> Result<Self, StorageError> {
        Ok(Self::at(&home()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Storage for JsonFileStorage {
    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StorageError> {
        let doc = load_document(&self.path)?;
        Ok(keys
            .iter()
            .filter_map(|key| doc.entries.get(*key).map(|v| ((*key).to_owned(), v.clone())))
            .collect())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = load_document(&self.path)?;
        doc.entries.insert(key.to_owned(), value);
        doc.saved_at = Utc::now();
        save_document(&self.path, &doc)?;
        tracing::trace!(key, path = %self.path.display(), "stored value");
        Ok(())
    }
}

/// Load the document at `path`. A missing file is an empty document.
pub fn load_document(path: &Path) -> Result<StorageDocument, StorageError> {
    if !path.exists() {
        return Ok(StorageDocument {
            saved_at: Utc::now(),
            entries: BTreeMap::new(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    match serde_json::from_str::<StorageDocumentCompat>(&contents)? {
        StorageDocumentCompat::Structured(doc) => Ok(StorageDocument {
            saved_at: doc.saved_at.unwrap_or_else(Utc::now),
            entries: doc.entries,
        }),
        StorageDocumentCompat::Bare(entries) => Ok(StorageDocument {
            saved_at: Utc::now(),
            entries,
        }),
    }
}

/// Atomically save `doc` to `path`.
///
/// Write flow: serialize → `.json.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_document(path: &Path, doc: &StorageDocument) -> Result<(), StorageError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(
            path,
            std::io::Error::other("invalid storage path"),
        ));
    };
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        set_dir_permissions(dir)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(doc)?;
    std::fs::write(&tmp_path, json).map_err(|e| io_err(&tmp_path, e))?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, StorageError> {
    dirs::home_dir().ok_or(StorageError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
