//! JSON-file storage backend.

use crate::{KeyValueStore, StoreError, StoreResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Key-value store backed by a single JSON file.
///
/// This is the primary backend on disk, rooted at
/// `~/.mailsfinder/credentials.json`. The whole map is rewritten on every
/// mutation; the data is a handful of small records so that is fine.
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn read_map(&self) -> StoreResult<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&content).map_err(|e| StoreError::Encoding(e.to_string()))
    }

    fn write_map(&self, map: &HashMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            serde_json::to_string_pretty(map).map_err(|e| StoreError::Encoding(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().unwrap();
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let _guard = self.lock.lock().unwrap();
        let map = self.read_map()?;
        Ok(map.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let _guard = self.lock.lock().unwrap();
        let mut map = self.read_map()?;
        let existed = map.remove(key).is_some();
        if existed {
            self.write_map(&map)?;
        }
        Ok(existed)
    }
}
