//! Saved-game storage
//!
//! Values are stored as JSON text under a small fixed set of keys. The
//! storage medium is pluggable: an in-memory map or one file per key.

use crate::config::Settings;
use crate::error::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

/// Logical names of the saved game state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    Matrix,
    CurrentPiece,
    NextPiece,
    Score,
    Level,
    RunTime,
    Pause,
    Record,
}

impl StateKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::Matrix => "matrix",
            StateKey::CurrentPiece => "currentPiece",
            StateKey::NextPiece => "nextPiece",
            StateKey::Score => "score",
            StateKey::Level => "level",
            StateKey::RunTime => "runTime",
            StateKey::Pause => "pause",
            StateKey::Record => "record",
        }
    }

    pub fn all() -> [StateKey; 8] {
        [
            StateKey::Matrix,
            StateKey::CurrentPiece,
            StateKey::NextPiece,
            StateKey::Score,
            StateKey::Level,
            StateKey::RunTime,
            StateKey::Pause,
            StateKey::Record,
        ]
    }
}

/// Raw key/value storage of JSON text
pub trait Storage: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
}

/// In-memory storage; clones share the same map
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Raw stored text for a key
    pub fn raw(&self, key: StateKey) -> Option<String> {
        self.values().get(key.as_str()).cloned()
    }

    /// Overwrite a key with arbitrary text
    pub fn put_raw(&self, key: StateKey, value: &str) {
        self.values().insert(key.as_str().to_string(), value.to_string());
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.values().insert(key.to_string(), value);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage in the platform data directory
    pub fn open_default() -> Result<Self> {
        let dirs = Settings::project_dirs().ok_or(Error::NoDataDir)?;
        Ok(Self::new(dirs.data_dir().join("save")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage(path, e)),
        }
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::storage(&self.dir, e))?;
        let path = self.path(key);
        fs::write(&path, value).map_err(|e| Error::storage(path, e))
    }
}

/// Typed access to a [`Storage`]
pub struct Persistence {
    storage: Box<dyn Storage>,
}

impl Persistence {
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
        }
    }

    pub fn save<T: Serialize + ?Sized>(&mut self, key: StateKey, value: &T) -> Result<()> {
        let text = serde_json::to_string(value).map_err(|e| Error::corrupt(key.as_str(), e))?;
        self.storage.set(key.as_str(), text)
    }

    /// Save, logging instead of failing; play goes on without the write
    pub fn save_or_warn<T: Serialize + ?Sized>(&mut self, key: StateKey, value: &T) {
        if let Err(e) = self.save(key, value) {
            warn!("could not save {}: {}", key.as_str(), e);
        }
    }

    /// Load a value; `Ok(None)` when nothing is stored under the key
    pub fn load<T: DeserializeOwned>(&self, key: StateKey) -> Result<Option<T>> {
        let Some(text) = self.storage.get(key.as_str())? else {
            return Ok(None);
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| Error::corrupt(key.as_str(), e))
    }
}

impl Default for Persistence {
    fn default() -> Self {
        Self::new(MemoryStorage::new())
    }
}
