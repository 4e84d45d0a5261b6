use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub const ITEMS_PER_PAGE_KEY: &str = "itemsPerPage";
pub const THEME_KEY: &str = "user-theme";

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid preference file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// String key/value preferences persisted as a flat JSON object.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl PreferenceStore {
    /// Loads `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PreferenceError> {
        let path = path.into();
        let values = match std::fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| PreferenceError::Json {
                    path: path.clone(),
                    source,
                })?
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(PreferenceError::Io { path, source }),
        };
        Ok(Self { path, values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Stores `value` and writes the file. A failed write leaves the old value in place.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<(), PreferenceError> {
        let previous = self.values.insert(key.to_string(), value.into());
        if let Err(err) = self.save() {
            match previous {
                Some(previous) => self.values.insert(key.to_string(), previous),
                None => self.values.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    /// Stored page size, or `default` when it is absent or not a positive number.
    pub fn page_size(&self, default: u32) -> u32 {
        self.get(ITEMS_PER_PAGE_KEY)
            .and_then(|value| value.trim().parse::<u32>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(default)
    }

    pub fn set_page_size(&mut self, page_size: u32) -> Result<(), PreferenceError> {
        self.set(ITEMS_PER_PAGE_KEY, page_size.to_string())
    }

    fn save(&self) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| PreferenceError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let body = serde_json::to_vec_pretty(&self.values).map_err(|source| {
            PreferenceError::Json {
                path: self.path.clone(),
                source,
            }
        })?;
        let partial = self.path.with_extension("json.partial");
        std::fs::write(&partial, body).map_err(|source| PreferenceError::Io {
            path: partial.clone(),
            source,
        })?;
        std::fs::rename(&partial, &self.path).map_err(|source| PreferenceError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
