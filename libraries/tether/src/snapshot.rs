//! # Local snapshots
//! The client's best-known copy of each collection, kept in a synchronous key-value store.
//! Each collection lives under its own namespaced key, wrapped in a version-tagged envelope.
//! Reads never fail: a missing, unreadable or undecodable value comes back as the type's default.

use std::{cell::RefCell, collections::BTreeMap};

use serde::{Serialize, de::DeserializeOwned};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A raw string key-value store, e.g. the browser's `localStorage`.
pub trait SnapshotStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for &S {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        (**self).keys()
    }
}

#[derive(serde::Deserialize)]
#[serde(tag = "version")]
enum Envelope<T> {
    V1 { data: T },
}

#[derive(serde::Serialize)]
#[serde(tag = "version")]
enum EnvelopeRef<'a, T> {
    V1 { data: &'a T },
}

impl<T> Envelope<T> {
    fn into_data(self) -> T {
        match self {
            Envelope::V1 { data } => data,
        }
    }
}

/// Typed, namespaced access to the collections held in a [`SnapshotStore`].
#[derive(Debug)]
pub struct LocalSnapshots<S> {
    store: S,
    namespace: String,
}

impl<S: SnapshotStore> LocalSnapshots<S> {
    pub fn new(store: S, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// A view of the same backend under another namespace.
    pub fn with_namespace(&self, namespace: impl Into<String>) -> LocalSnapshots<&S> {
        LocalSnapshots::new(&self.store, namespace)
    }

    pub fn key(&self, collection: &str) -> String {
        format!("{}:{collection}", self.namespace)
    }

    /// Returns the stored value, or `T::default()` if it is absent or can't be decoded.
    pub fn read<T: DeserializeOwned + Default>(&self, collection: &str) -> T {
        let key = self.key(collection);
        let raw = match self.store.get_item(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                log::warn!("Failed to read local snapshot {key}: {e}");
                return T::default();
            }
        };

        match serde_json::from_str::<Envelope<T>>(&raw) {
            Ok(envelope) => envelope.into_data(),
            Err(e) => {
                log::warn!("Discarding undecodable local snapshot {key}: {e}");
                T::default()
            }
        }
    }

    /// Replaces the stored value wholesale.
    pub fn write<T: Serialize>(&self, collection: &str, value: &T) -> Result<(), StorageError> {
        let key = self.key(collection);
        let raw = serde_json::to_string(&EnvelopeRef::V1 { data: value }).map_err(|e| {
            StorageError::Unavailable(format!("could not serialize snapshot {key}: {e}"))
        })?;
        self.store.set_item(&key, &raw)
    }

    pub fn clear(&self, collection: &str) -> Result<(), StorageError> {
        self.store.remove_item(&self.key(collection))
    }
}

/// In-process store, used by tests and hosts without persistent storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.items.borrow().keys().cloned().collect())
    }
}

/// One JSON file per key inside a directory.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStorage {
    const EXTENSION: &'static str = "json";

    pub fn open(dir: impl Into<std::path::PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn path(&self, key: &str) -> std::path::PathBuf {
        self.dir
            .join(format!("{}.{}", escape_key(key), Self::EXTENSION))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl SnapshotStore for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path(key);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(Self::EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match unescape_key(stem) {
                Some(key) => keys.push(key),
                None => log::warn!("Skipping unrecognized snapshot file {}", path.display()),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

// keys contain ':' which isn't portable in file names
#[cfg(not(target_arch = "wasm32"))]
fn escape_key(key: &str) -> String {
    urlencoding::encode(key).into_owned()
}

#[cfg(not(target_arch = "wasm32"))]
fn unescape_key(escaped: &str) -> Option<String> {
    urlencoding::decode(escaped).ok().map(|key| key.into_owned())
}

/// The browser's `localStorage`.
#[cfg(target_arch = "wasm32")]
pub struct WebStorage {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl WebStorage {
    pub fn local() -> Result<Self, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))?
            .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".to_string()))?;
        Ok(Self { storage })
    }
}

#[cfg(target_arch = "wasm32")]
impl SnapshotStore for WebStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.storage
            .remove_item(key)
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let len = self
            .storage
            .length()
            .map_err(|e| StorageError::Unavailable(format!("{e:?}")))?;
        let mut keys = Vec::new();
        for i in 0..len {
            match self.storage.key(i) {
                Ok(Some(key)) => keys.push(key),
                Ok(None) => {}
                Err(e) => log::warn!("Failed to read localStorage key {i}: {e:?}"),
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_missing_key_reads_default() {
        let snapshots = LocalSnapshots::new(MemoryStorage::new(), "test");
        let value: BTreeSet<String> = snapshots.read("saved_drills");
        assert!(value.is_empty());
    }

    #[test]
    fn test_roundtrip_through_envelope() {
        let snapshots = LocalSnapshots::new(MemoryStorage::new(), "test");
        let value: BTreeSet<String> = ["a".to_string(), "b".to_string()].into();
        snapshots.write("saved_drills", &value).unwrap();

        let raw = snapshots
            .store()
            .get_item("test:saved_drills")
            .unwrap()
            .unwrap();
        assert_eq!(raw, r#"{"version":"V1","data":["a","b"]}"#);

        let read: BTreeSet<String> = snapshots.read("saved_drills");
        assert_eq!(read, value);
    }

    #[test]
    fn test_corrupt_value_reads_default() {
        let snapshots = LocalSnapshots::new(MemoryStorage::new(), "test");
        snapshots
            .store()
            .set_item("test:queue", "{not json")
            .unwrap();
        let value: Vec<String> = snapshots.read("queue");
        assert!(value.is_empty(), "corrupt JSON should decode as empty");

        snapshots
            .store()
            .set_item("test:queue", r#"{"version":"V1","data":{"x":1}}"#)
            .unwrap();
        let value: Vec<String> = snapshots.read("queue");
        assert!(value.is_empty(), "wrong shape should decode as empty");
    }

    #[test]
    fn test_unknown_version_reads_default() {
        let snapshots = LocalSnapshots::new(MemoryStorage::new(), "test");
        snapshots
            .store()
            .set_item("test:queue", r#"{"version":"V9","data":["a"]}"#)
            .unwrap();
        let value: Vec<String> = snapshots.read("queue");
        assert!(value.is_empty());
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let storage = MemoryStorage::new();
        let alice = LocalSnapshots::new(&storage, "alice");
        let bob = LocalSnapshots::new(&storage, "bob");

        alice.write("queue", &vec!["drill-1".to_string()]).unwrap();

        let bobs: Vec<String> = bob.read("queue");
        assert!(bobs.is_empty());
        let alices: Vec<String> = alice.read("queue");
        assert_eq!(alices, vec!["drill-1".to_string()]);

        let alice_again = bob.with_namespace("alice");
        assert_eq!(alice_again.namespace(), "alice");
        let alices: Vec<String> = alice_again.read("queue");
        assert_eq!(alices, vec!["drill-1".to_string()]);
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        {
            let snapshots = LocalSnapshots::new(FileStorage::open(dir.path()).unwrap(), "boostpad");
            snapshots.write("queue", &vec!["x".to_string()]).unwrap();
        }

        let storage = FileStorage::open(dir.path()).unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["boostpad:queue".to_string()]);

        let snapshots = LocalSnapshots::new(storage, "boostpad");
        let queue: Vec<String> = snapshots.read("queue");
        assert_eq!(queue, vec!["x".to_string()]);

        snapshots.clear("queue").unwrap();
        let queue: Vec<String> = snapshots.read("queue");
        assert!(queue.is_empty());
        // removing twice is fine
        snapshots.clear("queue").unwrap();
    }

    #[test]
    fn test_key_escaping_roundtrips() {
        for key in ["boostpad:rank_snapshots", "a b/c", "plain"] {
            assert_eq!(unescape_key(&escape_key(key)).as_deref(), Some(key));
        }
        assert_eq!(escape_key("boostpad:queue"), "boostpad%3Aqueue");
        assert_eq!(unescape_key("boostpad%3Au1%3Aqueue").as_deref(), Some("boostpad:u1:queue"));
        assert_eq!(unescape_key("%FF"), None, "not UTF-8 once decoded");
    }
}
