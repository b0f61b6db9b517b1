#![forbid(unsafe_code)]

//! Durable stores for the debug layer.
//!
//! Two layers:
//!
//! - [`Storage`]: a byte-oriented key/value medium (strings in, strings out),
//!   shaped after browser local storage. [`MemoryStorage`] keeps entries in a
//!   shared map that outlives any one runtime; [`FileStorage`] keeps them in a
//!   single JSON document on disk.
//! - [`Store`]: one JSON value under one key. [`KeyedStore`] transcodes
//!   between [`serde_json::Value`] and the text held by a [`Storage`].
//!
//! A missing entry reads as `Ok(None)`. Text that does not decode is an error,
//! never a silent `None`, so callers can tell a corrupt entry from an empty one.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;
use tracing::trace;

use crate::error::{Result, StorageError};

// ─── Storage ─────────────────────────────────────────────────────────────────

/// A string key/value medium.
pub trait Storage {
    /// Text stored under `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    /// Store `value` under `key`, replacing any previous entry.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    /// Delete the entry under `key`. Deleting a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// In-memory [`Storage`].
///
/// Clones share entries, so a clone handed to a fresh runtime sees what an
/// earlier runtime wrote. That is how tests simulate a page reload.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    items: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// File-backed [`Storage`]: one JSON object mapping keys to their text.
///
/// Every write rewrites the whole document through a sibling temporary file
/// and a rename, so a crash mid-write leaves the previous document intact.
#[derive(Clone, Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage backed by the document at `path`. The file is created on the
    /// first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling written before the rename: the full file name plus `.tmp`.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(OsString::from).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text).map_err(|source| StorageError::Decode {
            key: self.path.display().to_string(),
            source,
        })
    }

    fn save(&self, items: &BTreeMap<String, String>) -> Result<()> {
        let text = serde_json::to_string_pretty(items).map_err(|source| StorageError::Encode {
            key: self.path.display().to_string(),
            source,
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.tmp_path();
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        trace!(path = %self.path.display(), entries = items.len(), "file storage saved");
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.load()?;
        items.insert(key.to_string(), value.to_string());
        self.save(&items)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.load()?;
        if items.remove(key).is_some() {
            self.save(&items)?;
        }
        Ok(())
    }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// One JSON value persisted somewhere durable.
pub trait Store {
    /// The stored value, `None` if nothing was stored yet.
    fn get(&self) -> Result<Option<Value>>;
    /// Replace the stored value.
    fn set(&self, value: &Value) -> Result<()>;
}

/// A [`Store`] kept under one key of a [`Storage`], encoded as JSON text.
#[derive(Clone, Debug)]
pub struct KeyedStore<S> {
    key: String,
    storage: S,
}

impl<S: Storage> KeyedStore<S> {
    /// Store under `key` in `storage`.
    pub fn new(key: impl Into<String>, storage: S) -> Self {
        Self {
            key: key.into(),
            storage,
        }
    }

    /// Storage key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Backing storage.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: Storage> Store for KeyedStore<S> {
    fn get(&self) -> Result<Option<Value>> {
        match self.storage.get_item(&self.key)? {
            None => Ok(None),
            Some(text) if text.is_empty() => Ok(None),
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|source| StorageError::Decode {
                    key: self.key.clone(),
                    source,
                }),
        }
    }

    fn set(&self, value: &Value) -> Result<()> {
        let text = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: self.key.clone(),
            source,
        })?;
        self.storage.set_item(&self.key, &text)
    }
}

/// Shorthand for [`KeyedStore::new`].
pub fn keyed_store<S: Storage>(key: impl Into<String>, storage: S) -> KeyedStore<S> {
    KeyedStore::new(key, storage)
}

/// Shared, type-erased [`Store`]. Two handles are equal iff they share the
/// same store allocation.
#[derive(Clone)]
pub struct StoreHandle(Rc<dyn Store>);

impl StoreHandle {
    /// Wrap a store.
    pub fn new(store: impl Store + 'static) -> Self {
        Self(Rc::new(store))
    }

    /// See [`Store::get`].
    pub fn get(&self) -> Result<Option<Value>> {
        self.0.get()
    }

    /// See [`Store::set`].
    pub fn set(&self, value: &Value) -> Result<()> {
        self.0.set(value)
    }
}

impl PartialEq for StoreHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StoreHandle")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_storage_clones_share_entries() {
        let storage = MemoryStorage::new();
        let reloaded = storage.clone();
        storage.set_item("k", "v").unwrap();
        assert_eq!(reloaded.get_item("k").unwrap().as_deref(), Some("v"));
        reloaded.remove_item("k").unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn keyed_store_round_trips_json() {
        let store = keyed_store("state", MemoryStorage::new());
        assert_eq!(store.get().unwrap(), None);
        store.set(&json!({"state": "dark"})).unwrap();
        assert_eq!(store.get().unwrap(), Some(json!({"state": "dark"})));
        assert_eq!(
            store.storage().get_item("state").unwrap().as_deref(),
            Some(r#"{"state":"dark"}"#)
        );
    }

    #[test]
    fn empty_text_reads_as_missing() {
        let storage = MemoryStorage::new();
        storage.set_item("state", "").unwrap();
        assert_eq!(keyed_store("state", storage).get().unwrap(), None);
    }

    #[test]
    fn corrupt_text_is_a_decode_error() {
        let storage = MemoryStorage::new();
        storage.set_item("state", "{not json").unwrap();
        let err = keyed_store("state", storage).get().unwrap_err();
        assert!(err.is_decode());
        assert!(err.to_string().contains("state"));
    }

    #[test]
    fn stored_null_is_distinct_from_missing() {
        let store = keyed_store("state", MemoryStorage::new());
        store.set(&Value::Null).unwrap();
        assert_eq!(store.get().unwrap(), Some(Value::Null));
    }

    #[test]
    fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        FileStorage::new(&path).set_item("a", "1").unwrap();
        FileStorage::new(&path).set_item("b", "2").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get_item("a").unwrap().as_deref(), Some("1"));
        assert_eq!(reopened.get_item("b").unwrap().as_deref(), Some("2"));
        assert_eq!(reopened.get_item("c").unwrap(), None);

        reopened.remove_item("a").unwrap();
        assert_eq!(reopened.get_item("a").unwrap(), None);
    }

    #[test]
    fn file_storage_temp_name_keeps_full_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let json = FileStorage::new(dir.path().join("state.json"));
        let yaml = FileStorage::new(dir.path().join("state.yaml"));
        assert_eq!(json.tmp_path(), dir.path().join("state.json.tmp"));
        assert_ne!(json.tmp_path(), yaml.tmp_path());
        assert_eq!(
            FileStorage::new(dir.path().join("state.tmp")).tmp_path(),
            dir.path().join("state.tmp.tmp")
        );
    }

    #[test]
    fn file_storage_write_leaves_neighbouring_tmp_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let neighbour = FileStorage::new(dir.path().join("state.tmp"));
        neighbour.set_item("kept", "1").unwrap();

        FileStorage::new(dir.path().join("state.json")).set_item("a", "2").unwrap();
        assert_eq!(neighbour.get_item("kept").unwrap().as_deref(), Some("1"));
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn file_storage_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("absent.json"));
        assert_eq!(storage.get_item("a").unwrap(), None);
    }

    #[test]
    fn file_storage_corrupt_document_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "[1, 2").unwrap();
        let err = FileStorage::new(&path).get_item("a").unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn store_handles_compare_by_allocation() {
        let a = StoreHandle::new(keyed_store("k", MemoryStorage::new()));
        assert_eq!(a, a.clone());
        assert_ne!(a, StoreHandle::new(keyed_store("k", MemoryStorage::new())));
    }
}
