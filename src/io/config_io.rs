use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::state_io::StateError;
use crate::model::settings::HostConfig;

pub const CONFIG_FILE: &str = "tasktree.toml";

/// Read `tasktree.toml` from `dir`. A missing file yields the defaults; an
/// unreadable or invalid one is an error.
pub fn read_config(dir: &Path) -> Result<HostConfig, StateError> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(HostConfig::default());
    }
    let text = fs::read_to_string(&path).map_err(|e| StateError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    Ok(toml::from_str(&text)?)
}

/// The state file a config points at, resolved against `dir`
pub fn state_file_path(dir: &Path, config: &HostConfig) -> PathBuf {
    dir.join(&config.storage.file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = read_config(tmp.path()).unwrap();
        assert_eq!(config.storage.file, "tasks.xml");
        assert_eq!(
            state_file_path(tmp.path(), &config),
            tmp.path().join("tasks.xml")
        );
    }

    #[test]
    fn test_reads_storage_and_display() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "[storage]\nfile = \"todo/state.xml\"\n\n[display]\nindent = 2\nshow_ids = false\n",
        )
        .unwrap();
        let config = read_config(tmp.path()).unwrap();
        assert_eq!(config.storage.file, "todo/state.xml");
        assert_eq!(config.display.indent, 2);
        assert!(!config.display.show_ids);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[display]\nindent = \"wide\"\n").unwrap();
        assert!(matches!(
            read_config(tmp.path()),
            Err(StateError::ConfigParseError(_))
        ));
    }
}
