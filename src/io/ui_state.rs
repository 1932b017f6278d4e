use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const UI_STATE_FILE: &str = ".tasktree-ui.json";

/// View toggles that persist between runs (written to .tasktree-ui.json)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UiState {
    #[serde(default)]
    pub group_by_priority: bool,
    #[serde(default)]
    pub hide_completed: bool,
}

fn ui_state_path(dir: &Path) -> PathBuf {
    dir.join(UI_STATE_FILE)
}

/// Read the view toggles from `dir`. Missing or malformed files read as
/// `None`.
pub fn read_ui_state(dir: &Path) -> Option<UiState> {
    let content = fs::read_to_string(ui_state_path(dir)).ok()?;
    serde_json::from_str(&content).ok()
}

pub fn write_ui_state(dir: &Path, state: &UiState) -> Result<(), std::io::Error> {
    let content = serde_json::to_string_pretty(state)?;
    fs::write(ui_state_path(dir), content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let state = UiState {
            group_by_priority: true,
            hide_completed: false,
        };
        write_ui_state(dir.path(), &state).unwrap();
        assert_eq!(read_ui_state(dir.path()), Some(state));
    }

    #[test]
    fn read_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_ui_state(dir.path()).is_none());
    }

    #[test]
    fn read_malformed_json_returns_none() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(UI_STATE_FILE), "not json {{{").unwrap();
        assert!(read_ui_state(dir.path()).is_none());
    }

    #[test]
    fn serde_defaults_on_partial_object() {
        let state: UiState = serde_json::from_str(r#"{"hide_completed":true}"#).unwrap();
        assert!(state.hide_completed);
        assert!(!state.group_by_priority);
    }
}
