//! Persistence port for the state document.
//!
//! The engine loads the document once at startup and saves it after every
//! accepted mutation. A [`StateStore`] only has to round-trip a complete
//! [`GameState`]; the JSON-file implementation lives in `club-store`.
//! [`MemoryStore`] keeps the serialized document in memory for tests and
//! ephemeral sessions.

use std::sync::{Mutex, PoisonError};

use club_types::GameState;

/// Errors that can occur loading or saving the state document.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend refused the write.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Load and save access to the single state document.
pub trait StateStore: Send + Sync {
    /// Load the stored document. `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<GameState>, StoreError>;

    /// Replace the stored document with `state`.
    fn save(&self, state: &GameState) -> Result<(), StoreError>;
}

/// Store that keeps the serialized document in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            document: Mutex::new(None),
        }
    }

    /// Create a store already holding `state`.
    pub fn with_state(state: &GameState) -> Result<Self, StoreError> {
        let json = serde_json::to_string(state)?;
        Ok(Self {
            document: Mutex::new(Some(json)),
        })
    }

    /// Create a store holding a raw JSON document, as a legacy file would.
    pub fn with_document(json: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(json.into())),
        }
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<GameState>, StoreError> {
        let guard = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(StoreError::from)
    }

    fn save(&self, state: &GameState) -> Result<(), StoreError> {
        let json = serde_json::to_string(state)?;
        *self.document.lock().unwrap_or_else(PoisonError::into_inner) = Some(json);
        Ok(())
    }
}
