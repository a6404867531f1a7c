//! Crash-safe persistence of the health state record.
//!
//! # Responsibilities
//! - Load the record, salvaging whatever fields are still valid
//! - Save the record through a temp file and an atomic rename
//!
//! # Design Decisions
//! - A torn write is never observable: readers see the old or the new file
//! - Missing or corrupt records degrade to defaults instead of erroring

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::state::types::{unix_now, HealthState, Status};

/// Errors surfaced by [`StateStore::try_save`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// File-backed store for one [`HealthState`] record.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record, falling back to `defaults` for anything unusable.
    pub fn load(&self, defaults: &HealthState) -> HealthState {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return defaults.clone(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read health state, using defaults");
                return defaults.clone();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(record)) => salvage(record, defaults),
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "Health state is not an object, using defaults");
                defaults.clone()
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Health state is corrupt, using defaults");
                defaults.clone()
            }
        }
    }

    /// Like [`load`](Self::load), but reports whether the record was readable.
    ///
    /// Returns `Ok(None)` when no record exists yet.
    pub fn read_strict(&self, defaults: &HealthState) -> Result<Option<HealthState>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(record) => Ok(Some(salvage(record, defaults))),
            other => Err(StoreError::Serialize(serde::de::Error::custom(format!(
                "expected an object, found {}",
                other
            )))),
        }
    }

    /// Persist the record. Failures are logged and swallowed.
    pub fn save(&self, state: &mut HealthState) {
        if let Err(e) = self.try_save(state) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to persist health state");
        }
    }

    /// Persist the record via temp file and rename.
    ///
    /// Expired counter windows are rolled first so the saved record and the
    /// caller's copy agree.
    pub fn try_save(&self, state: &mut HealthState) -> Result<(), StoreError> {
        state.roll_windows(unix_now());

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let bytes = serde_json::to_vec_pretty(state)?;
        let tmp = self.temp_path();
        let io_err = |source| StoreError::Io {
            path: tmp.clone(),
            source,
        };

        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        tracing::trace!(path = %self.path.display(), "Health state persisted");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "health_state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Overlay each field of `record` onto `defaults`, keeping only fields that
/// deserialize with the right type.
fn salvage(record: Map<String, Value>, defaults: &HealthState) -> HealthState {
    let mut merged = match serde_json::to_value(defaults) {
        Ok(Value::Object(map)) => map,
        _ => return defaults.clone(),
    };

    if !record.contains_key("status") {
        merged.insert("status".into(), Value::String(Status::Degraded.as_str().into()));
    }

    for (key, value) in record {
        if !merged.contains_key(&key) {
            continue;
        }
        let previous = merged.insert(key.clone(), value);
        if serde_json::from_value::<HealthState>(Value::Object(merged.clone())).is_err() {
            tracing::debug!(field = %key, "Dropping invalid health state field");
            match previous {
                Some(p) => merged.insert(key, p),
                None => merged.remove(&key),
            };
        }
    }

    serde_json::from_value(Value::Object(merged)).unwrap_or_else(|_| defaults.clone())
}
