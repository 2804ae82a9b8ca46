//! `KvStore` implementations.
//!
//! `MemoryStore` keeps values in a `HashMap` behind a `Mutex` and is the
//! reference implementation used by tests.  `FileStore` keeps one file per
//! key in a directory and is what the operator CLI points at.

use std::{
    collections::HashMap,
    fs::{self, File, OpenOptions},
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use fs2::FileExt;
use tracing::debug;

use bioledger_contracts::error::{LedgerError, LedgerResult};

use crate::traits::KvStore;

fn poisoned<E: std::fmt::Display>(e: E) -> LedgerError {
    LedgerError::Storage {
        reason: format!("store lock poisoned: {}", e),
    }
}

// ── In-memory store ───────────────────────────────────────────────────────────

/// A `KvStore` held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn read(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        let values = self.values.lock().map_err(poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn write(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        let mut values = self.values.lock().map_err(poisoned)?;
        values.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> LedgerResult<bool> {
        let mut values = self.values.lock().map_err(poisoned)?;
        if values.get(key).map(Vec::as_slice) != expected {
            debug!(key = %key, "compare-and-set rejected: value changed");
            return Ok(false);
        }
        values.insert(key.to_string(), new.to_vec());
        Ok(true)
    }

    fn remove(&self, key: &str) -> LedgerResult<()> {
        let mut values = self.values.lock().map_err(poisoned)?;
        values.remove(key);
        Ok(())
    }
}

// ── Directory-backed store ────────────────────────────────────────────────────

/// A `KvStore` that keeps each key in its own file under `root`.
///
/// Writes go to a uniquely named temporary file that is then renamed over
/// the target, so readers see either the old or the new value in full.
/// Every mutation holds an exclusive advisory lock on the key's `.lock`
/// file, so any number of `FileStore` handles, in this process or others,
/// may share one directory.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
}

/// Held for the duration of one mutation; the lock is released on drop.
struct KeyLock {
    _file: File,
}

impl FileStore {
    /// Open (creating if necessary) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> LedgerResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| LedgerError::Storage {
            reason: format!("failed to create store directory '{}': {}", root.display(), e),
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to its file.  Keys may contain ASCII alphanumerics and
    /// `-`, `_`, `.`, `/`; slashes become dots so every key is one flat file.
    fn path_for(&self, key: &str) -> LedgerResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));
        if !valid {
            return Err(LedgerError::Storage {
                reason: format!("invalid store key '{}'", key),
            });
        }
        Ok(self.root.join(format!("{}.json", key.replace('/', "."))))
    }

    /// Block until this process holds the exclusive lock for `path`.
    fn lock_path(path: &Path) -> LedgerResult<KeyLock> {
        let lock_path = path.with_extension("lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| LedgerError::Storage {
                reason: format!("failed to open lock '{}': {}", lock_path.display(), e),
            })?;
        file.lock_exclusive().map_err(|e| LedgerError::Storage {
            reason: format!("failed to lock '{}': {}", lock_path.display(), e),
        })?;
        Ok(KeyLock { _file: file })
    }

    fn read_path(path: &Path) -> LedgerResult<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LedgerError::Storage {
                reason: format!("failed to read '{}': {}", path.display(), e),
            }),
        }
    }

    fn write_path(&self, path: &Path, value: &[u8]) -> LedgerResult<()> {
        let tmp = self
            .root
            .join(format!(".tmp-{}", uuid::Uuid::new_v4()));
        fs::write(&tmp, value).map_err(|e| LedgerError::Storage {
            reason: format!("failed to write '{}': {}", tmp.display(), e),
        })?;
        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            LedgerError::Storage {
                reason: format!("failed to commit '{}': {}", path.display(), e),
            }
        })
    }
}

impl KvStore for FileStore {
    fn read(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        Self::read_path(&self.path_for(key)?)
    }

    fn write(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        let path = self.path_for(key)?;
        let _lock = Self::lock_path(&path)?;
        self.write_path(&path, value)
    }

    fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> LedgerResult<bool> {
        let path = self.path_for(key)?;
        let _lock = Self::lock_path(&path)?;
        let current = Self::read_path(&path)?;
        if current.as_deref() != expected {
            debug!(key = %key, "compare-and-set rejected: value changed");
            return Ok(false);
        }
        self.write_path(&path, new)?;
        Ok(true)
    }

    fn remove(&self, key: &str) -> LedgerResult<()> {
        let path = self.path_for(key)?;
        let _lock = Self::lock_path(&path)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LedgerError::Storage {
                reason: format!("failed to remove '{}': {}", path.display(), e),
            }),
        }
    }
}
