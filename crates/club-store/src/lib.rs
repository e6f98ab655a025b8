//! JSON file persistence for the climate club state document.
//!
//! [`JsonFileStore`] implements [`StateStore`] over a single pretty-printed
//! JSON file. Saves go to a sibling temporary file which is then renamed
//! over the target, so readers never see a half-written document.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use club_core::store::{StateStore, StoreError};
use club_types::GameState;
use tracing::debug;

/// State store backed by one JSON file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store the document at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(ToOwned::to_owned)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<Option<GameState>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let state = serde_json::from_str(&raw)?;
        debug!(path = %self.path.display(), "State document read");
        Ok(Some(state))
    }

    fn save(&self, state: &GameState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state)?;
        let temp = self.temp_path();
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.path)?;
        debug!(path = %self.path.display(), turn = state.turn, "State document written");
        Ok(())
    }
}
