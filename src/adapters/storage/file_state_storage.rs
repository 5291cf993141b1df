//! File-based State Storage Adapter
//!
//! Stores each session's checkpoint as `<base>/<session_id>.yaml`. Writes go to
//! a temporary file first and are renamed into place. A process-local lock
//! serialises the revision check with the write.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use crate::domain::assessment::ChatState;
use crate::domain::foundation::SessionId;
use crate::ports::{StateStorage, StateStorageError};

#[derive(Debug)]
pub struct FileStateStorage {
    base_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStateStorage {
    /// Create a new file storage with a base directory
    ///
    /// # Example
    /// ```ignore
    /// let storage = FileStateStorage::new("./data/chat_states");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn state_file_path(&self, session_id: &SessionId) -> PathBuf {
        self.base_path.join(format!("{}.yaml", session_id))
    }

    async fn ensure_dir(&self) -> Result<(), StateStorageError> {
        fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| StateStorageError::IoError(e.to_string()))
    }

    async fn read_state(&self, session_id: &SessionId) -> Result<Option<ChatState>, StateStorageError> {
        let file_path = self.state_file_path(session_id);

        let yaml = match fs::read_to_string(&file_path).await {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StateStorageError::IoError(e.to_string())),
        };

        serde_yaml::from_str(&yaml)
            .map(Some)
            .map_err(|e| StateStorageError::DeserializationFailed(e.to_string()))
    }
}

#[async_trait]
impl StateStorage for FileStateStorage {
    async fn get_state(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<ChatState>, StateStorageError> {
        self.read_state(session_id).await
    }

    async fn update_state(
        &self,
        session_id: &SessionId,
        state: &ChatState,
    ) -> Result<u64, StateStorageError> {
        let _guard = self.write_lock.lock().await;

        let found = self
            .read_state(session_id)
            .await?
            .map(|s| s.revision)
            .unwrap_or(0);
        if found != state.revision {
            return Err(StateStorageError::Conflict {
                session_id: *session_id,
                expected: state.revision,
                found,
            });
        }

        let mut stored = state.clone();
        stored.revision = found + 1;
        let yaml = serde_yaml::to_string(&stored)
            .map_err(|e| StateStorageError::SerializationFailed(e.to_string()))?;

        self.ensure_dir().await?;
        let file_path = self.state_file_path(session_id);
        let tmp_path = file_path.with_extension("yaml.tmp");
        fs::write(&tmp_path, yaml)
            .await
            .map_err(|e| StateStorageError::IoError(e.to_string()))?;
        fs::rename(&tmp_path, &file_path)
            .await
            .map_err(|e| StateStorageError::IoError(e.to_string()))?;

        tracing::debug!(session_id = %session_id, revision = stored.revision, "Checkpoint written");
        Ok(stored.revision)
    }

    async fn delete_state(&self, session_id: &SessionId) -> Result<(), StateStorageError> {
        let _guard = self.write_lock.lock().await;

        match fs::remove_file(self.state_file_path(session_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StateStorageError::IoError(e.to_string())),
        }
    }
}
