//! Server settings.
//!
//! Read from `.propmeta.json` in the workspace root, then overridden key by
//! key from the client's `initializationOptions`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Settings file name looked up in the workspace root.
pub const SETTINGS_FILE: &str = ".propmeta.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn default_scan_workspace() -> bool {
    true
}

fn default_max_suggestions() -> usize {
    200
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Extra metadata documents to ingest
    #[serde(default)]
    pub metadata_paths: Vec<PathBuf>,
    /// Type catalog files, or directories of them
    #[serde(default)]
    pub type_catalog_paths: Vec<PathBuf>,
    /// Look for `META-INF/*configuration-metadata.json` under the workspace root
    #[serde(default = "default_scan_workspace")]
    pub scan_workspace: bool,
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            metadata_paths: Vec::new(),
            type_catalog_paths: Vec::new(),
            scan_workspace: default_scan_workspace(),
            max_suggestions: default_max_suggestions(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Settings, SettingsError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Settings::default()),
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(write_err)
    }

    /// Overlay the keys present in a JSON object onto these settings.
    pub fn merge_json(&mut self, overrides: &serde_json::Value) -> Result<(), SettingsError> {
        let serde_json::Value::Object(overrides) = overrides else {
            return Ok(());
        };
        let mut current = serde_json::to_value(&*self)?;
        if let serde_json::Value::Object(ref mut fields) = current {
            for (key, value) in overrides {
                fields.insert(key.clone(), value.clone());
            }
        }
        *self = serde_json::from_value(current)?;
        Ok(())
    }

    /// Resolve relative paths against the workspace root.
    pub fn absolutize(&mut self, root: &Path) {
        for path in self
            .metadata_paths
            .iter_mut()
            .chain(self.type_catalog_paths.iter_mut())
        {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        }
    }
}
