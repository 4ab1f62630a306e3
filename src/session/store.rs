use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access preferences file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize preferences: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// String key-value persistence for user preferences
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Volatile store, for tests and sessions without a preferences file
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Flat JSON object on disk, rewritten on every `set`.
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open `path`, creating it when missing. A file that does not parse is
    /// kept as `<name>.json.bak` and replaced with an empty store; if the
    /// backup cannot be written the file is left untouched and the error
    /// returned.
    pub fn load_or_create(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        if !path.exists() {
            let store = Self {
                path,
                values: BTreeMap::new(),
            };
            store.save_raw()?;
            tracing::info!("Created preferences file at {:?}", store.path);
            return Ok(store);
        }

        let raw = fs::read_to_string(&path)?;
        match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
            Ok(values) => Ok(Self { path, values }),
            Err(e) => {
                let backup = path.with_extension("json.bak");
                tracing::warn!(
                    "Preferences file {:?} unreadable ({}), backing up to {:?}",
                    path,
                    e,
                    backup
                );
                if let Err(copy_err) = fs::copy(&path, &backup) {
                    tracing::warn!(
                        "Could not back up {:?} to {:?} ({}), leaving it untouched",
                        path,
                        backup,
                        copy_err
                    );
                    return Err(copy_err.into());
                }
                let store = Self {
                    path,
                    values: BTreeMap::new(),
                };
                store.save_raw()?;
                Ok(store)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save_raw(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        self.save_raw()
    }
}
