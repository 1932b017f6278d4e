use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::lock::LockError;
use crate::model::settings::TaskSettings;
use crate::model::store::TaskStore;
use crate::parse::{ParseError, parse_state, serialize_state};

/// Error type for loading and saving persisted state
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse { path: PathBuf, source: ParseError },
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("could not parse tasktree.toml: {0}")]
    ConfigParseError(#[from] toml::de::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Load the state file at `path`. A file that does not exist yet loads as
/// an empty store with default settings.
pub fn load_state(path: &Path) -> Result<(TaskStore, TaskSettings), StateError> {
    if !path.exists() {
        debug!(path = %path.display(), "no state file yet");
        return Ok((TaskStore::new(), TaskSettings::default()));
    }
    let text = fs::read_to_string(path).map_err(|e| StateError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let (store, settings) = parse_state(&text).map_err(|e| StateError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!(path = %path.display(), top_level = store.len(), "state loaded");
    Ok((store, settings))
}

/// Write the store and settings to `path`, replacing it atomically.
pub fn save_state(path: &Path, store: &TaskStore, settings: &TaskSettings) -> Result<(), StateError> {
    let content = serialize_state(store, settings);
    atomic_write(path, content.as_bytes()).map_err(|e| StateError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!(path = %path.display(), bytes = content.len(), "state saved");
    Ok(())
}

/// Write `content` to a temp file beside `path`, then rename it into place
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::store::NewTask;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let (store, settings) = load_state(&tmp.path().join("tasks.xml")).unwrap();
        assert!(store.is_empty());
        assert_eq!(settings, TaskSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tasks.xml");
        let mut store = TaskStore::new();
        let p = store.add_task(None, NewTask::titled("Parent")).unwrap();
        store.add_task(Some(p), NewTask::titled("Child")).unwrap();
        let settings = TaskSettings {
            propagate_priority: true,
            ..Default::default()
        };

        save_state(&path, &store, &settings).unwrap();
        let (loaded, loaded_settings) = load_state(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.task_at(0).unwrap().subtasks()[0].title(),
            Some("Child")
        );
        assert_eq!(loaded_settings, settings);
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tasks.xml");
        fs::write(&path, "<component><tasks></component>").unwrap();
        match load_state(&path) {
            Err(StateError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.txt");
        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }
}
