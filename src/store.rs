//! Registry state file
//!
//! Persists [`RegistryState`] as pretty-printed JSON
//! (`{"referenceTime": ..., "clocks": [...]}`). Writes go to a sibling
//! `.tmp` file first and are renamed into place.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::clock::{ClockError, ClockRegistry, RegistryState};

/// Errors that can occur while reading or writing the state file
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O operation failed
    #[error("IO error on {path:?}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    /// File content is not valid state JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File parsed but holds invalid clocks
    #[error("Invalid state: {0}")]
    InvalidState(#[from] ClockError),
}

/// Result type for state file operations
pub type StoreResult<T> = Result<T, StoreError>;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |error| StoreError::Io {
        path: path.to_path_buf(),
        error,
    }
}

/// Read a state file; `None` when it does not exist yet
pub fn load_state(path: &Path) -> StoreResult<Option<RegistryState>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(io_error(path))?;
    let state = serde_json::from_str(&content)?;
    Ok(Some(state))
}

/// Write a state file, creating parent directories as needed
pub fn save_state(path: &Path, state: &RegistryState) -> StoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let content = serde_json::to_string_pretty(state)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, content).map_err(io_error(&tmp))?;
    if let Err(error) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            error,
        });
    }

    tracing::debug!(path = %path.display(), clocks = state.clocks.len(), "State saved");
    Ok(())
}

/// Import a state file into `registry`; returns false when the file is absent
pub fn load_into(path: &Path, registry: &mut ClockRegistry) -> StoreResult<bool> {
    match load_state(path)? {
        Some(state) => {
            registry.import_state(state)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Save the registry's exported state
pub fn save_registry(path: &Path, registry: &ClockRegistry) -> StoreResult<()> {
    save_state(path, &registry.export_state())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::NewClock;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(load_state(&dir.path().join("state.json")).unwrap().is_none());

        let mut registry = ClockRegistry::default();
        assert!(!load_into(&dir.path().join("state.json"), &mut registry).unwrap());
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut registry = ClockRegistry::default();
        registry
            .add_clock(NewClock::new("15:10", "Library Clock"))
            .unwrap();
        registry.update_clock_time(1, "14:50").unwrap();
        save_registry(&path, &registry).unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());

        let mut restored = ClockRegistry::new(crate::clock::TimeOfDay::MIDNIGHT, 0);
        assert!(load_into(&path, &mut restored).unwrap());
        assert_eq!(restored.len(), 5);
        assert_eq!(restored.reference_time().to_string(), "15:00");
        assert_eq!(restored.get(1).unwrap().time().to_string(), "14:50");
        assert_eq!(restored.get(1).unwrap().sync_history().len(), 1);
    }

    #[test]
    fn test_file_uses_camel_case() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        save_registry(&path, &ClockRegistry::default()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["referenceTime"], "15:00");
        assert_eq!(raw["clocks"][0]["name"], "Town Square Clock");
        assert!(raw["clocks"][0]["syncHistory"].is_array());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            load_state(&path),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_invalid_clock_in_file_leaves_registry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(
            &path,
            r#"{"referenceTime": "12:00", "clocks": [{"id": 1, "name": "Bad", "time": "24:00"}]}"#,
        )
        .unwrap();

        let mut registry = ClockRegistry::default();
        let err = load_into(&path, &mut registry).unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidState(ClockError::InvalidTimeFormat(_))
        ));
        assert_eq!(registry.reference_time().to_string(), "15:00");
    }
}
