//! Saved connection profiles, kept in a key/value store.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;

/// Storage key holding the profile list.
pub const PROFILES_KEY: &str = "accounts";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub key: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub name: String,
    pub key: String,
    pub endpoint: String,
}

/// String key/value persistence.
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }
}

/// A single JSON object file mapping keys to string values.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `<config dir>/dynamo-console/storage.json`
    pub fn in_config_dir() -> Result<Self, StoreError> {
        let dir = dirs::config_dir().ok_or(StoreError::NoConfigDir)?;
        Ok(Self::new(dir.join("dynamo-console").join("storage.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value);

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;

        // Write beside the target and rename over it, so readers never see
        // a partial file.
        let text = serde_json::to_string_pretty(&entries)?;
        let mut staged = NamedTempFile::new_in(parent).map_err(|e| self.io_error(e))?;
        staged
            .write_all(text.as_bytes())
            .map_err(|e| self.io_error(e))?;
        staged
            .persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;
        debug!(path = %self.path.display(), key, "Storage written");
        Ok(())
    }
}

/// Profile repository over any [`StorageBackend`].
pub struct ProfileStore<S> {
    storage: S,
}

impl<S: StorageBackend> ProfileStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Profiles in insertion order. Missing or empty storage yields none.
    pub fn list(&self) -> Result<Vec<Profile>, StoreError> {
        match self.storage.get(PROFILES_KEY)? {
            Some(text) if !text.trim().is_empty() => Ok(serde_json::from_str(&text)?),
            _ => Ok(Vec::new()),
        }
    }

    pub fn add(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        let mut profiles = self.list()?;
        let stored = Profile {
            id: Uuid::new_v4().to_string(),
            name: profile.name,
            key: profile.key,
            endpoint: profile.endpoint,
        };
        profiles.push(stored.clone());
        self.save(&profiles)?;
        Ok(stored)
    }

    /// Returns whether a profile with `id` existed.
    pub fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let mut profiles = self.list()?;
        let before = profiles.len();
        profiles.retain(|p| p.id != id);
        if profiles.len() == before {
            return Ok(false);
        }
        self.save(&profiles)?;
        Ok(true)
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.list()?.into_iter().find(|p| p.name == name))
    }

    fn save(&self, profiles: &[Profile]) -> Result<(), StoreError> {
        self.storage
            .set(PROFILES_KEY, serde_json::to_string(profiles)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn local(name: &str) -> NewProfile {
        NewProfile {
            name: name.to_string(),
            key: "local".to_string(),
            endpoint: "http://localhost:8000".to_string(),
        }
    }

    #[test]
    fn test_empty_storage_lists_nothing() {
        let store = ProfileStore::new(MemoryStorage::new());
        assert!(store.list().unwrap().is_empty());

        store.storage().set(PROFILES_KEY, String::new()).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_add_keeps_insertion_order_and_fresh_ids() {
        let store = ProfileStore::new(MemoryStorage::new());

        let first = store.add(local("dev")).unwrap();
        let second = store.add(local("staging")).unwrap();

        assert_ne!(first.id, second.id);
        assert!(Uuid::parse_str(&first.id).is_ok());
        let names: Vec<_> = store.list().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["dev", "staging"]);
    }

    #[test]
    fn test_remove_by_id() {
        let store = ProfileStore::new(MemoryStorage::new());
        let dev = store.add(local("dev")).unwrap();
        store.add(local("staging")).unwrap();

        assert!(store.remove(&dev.id).unwrap());
        assert!(!store.remove(&dev.id).unwrap());
        assert_eq!(store.list().unwrap().len(), 1);
        assert!(store.find_by_name("dev").unwrap().is_none());
        assert!(store.find_by_name("staging").unwrap().is_some());
    }

    #[test]
    fn test_profiles_stored_under_accounts_key() {
        let store = ProfileStore::new(MemoryStorage::new());
        let dev = store.add(local("dev")).unwrap();

        let raw = store.storage().get(PROFILES_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(
            value,
            serde_json::json!([{
                "id": dev.id,
                "name": "dev",
                "key": "local",
                "endpoint": "http://localhost:8000"
            }])
        );
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let added = ProfileStore::new(FileStorage::new(&path))
            .add(local("dev"))
            .unwrap();
        let reopened = ProfileStore::new(FileStorage::new(&path));

        assert_eq!(reopened.list().unwrap(), vec![added]);
    }

    #[test]
    fn test_file_storage_replaces_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let storage = FileStorage::new(&path);

        for n in 0..5 {
            storage.set("counter", n.to_string()).unwrap();
        }
        storage.set("other", "x".to_string()).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("storage.json")]);

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("counter").unwrap().as_deref(), Some("4"));
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_file_storage_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();

        let store = ProfileStore::new(FileStorage::new(&path));

        assert!(matches!(store.list(), Err(StoreError::Json(_))));
    }
}
