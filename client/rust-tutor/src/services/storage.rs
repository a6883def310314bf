use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::models::{ChatMessage, Settings};

/// The part of the session that survives a restart. Submission, guidance,
/// practice problems and the loading/error flags are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage document is invalid: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Key-value medium for the persisted subset of the session store.
pub trait StateStorage: Send + Sync {
    fn load(&self) -> Result<Option<PersistedState>, StorageError>;
    fn save(&self, state: &PersistedState) -> Result<(), StorageError>;
}

/// JSON document on disk.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl StateStorage for FileStorage {
    fn load(&self) -> Result<Option<PersistedState>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    fn save(&self, state: &PersistedState) -> Result<(), StorageError> {
        let data = serde_json::to_string_pretty(state)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, data)?;
        Ok(())
    }
}

/// Keeps the serialized document in memory; used by tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStorage {
    document: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self) -> Option<String> {
        self.document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl StateStorage for MemoryStorage {
    fn load(&self) -> Result<Option<PersistedState>, StorageError> {
        match self.raw() {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &PersistedState) -> Result<(), StorageError> {
        let data = serde_json::to_string(state)?;
        *self
            .document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;

    fn sample_state() -> PersistedState {
        PersistedState {
            session_id: Some("2b1f7c1e-0000-4000-8000-000000000001".to_string()),
            settings: Settings {
                provider: Provider::OpenAi,
                api_key: Some("sk-test".to_string()),
            },
            history: vec![
                ChatMessage::user_text("What is 3 * 4?"),
                ChatMessage::assistant_text("Think of three groups of four."),
            ],
        }
    }

    #[test]
    fn file_storage_missing_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("state.json"));
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn file_storage_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested/deeper/state.json"));
        let state = sample_state();

        storage.save(&state).unwrap();

        assert_eq!(storage.load().unwrap(), Some(state));
    }

    #[test]
    fn corrupt_document_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        let err = FileStorage::new(path).load().unwrap_err();
        assert!(matches!(err, StorageError::Serde(_)));
    }

    #[test]
    fn memory_storage_keeps_latest_document() {
        let storage = MemoryStorage::new();
        assert!(storage.load().unwrap().is_none());

        let mut state = sample_state();
        storage.save(&state).unwrap();
        state.history.clear();
        storage.save(&state).unwrap();

        assert!(storage.load().unwrap().unwrap().history.is_empty());
    }
}
