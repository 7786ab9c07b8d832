//! File-backed session storage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::Result;
use crate::error::StorageError;

use super::{PersistedSession, SessionStorage};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Session storage backed by a JSON file.
///
/// The record is written as pretty-printed JSON. On Unix the file is given
/// `0600` permissions, since it contains credentials.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Create a file storage writing to the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a file storage using the conventional `session.json` name
    /// inside the given directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join("session.json"),
        }
    }

    /// The path of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStorage for FileStorage {
    async fn load(&self) -> Result<Option<PersistedSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(StorageError::Io)?;
        let session: PersistedSession =
            serde_json::from_str(&json).map_err(StorageError::Serde)?;

        debug!(path = %self.path.display(), "Loaded persisted session");
        Ok(Some(session))
    }

    async fn save(&self, session: &PersistedSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StorageError::Io)?;
        }

        let json = serde_json::to_string_pretty(session).map_err(StorageError::Serde)?;
        tokio::fs::write(&self.path, &json)
            .await
            .map_err(StorageError::Io)?;

        // Set restrictive permissions (Unix only)
        #[cfg(unix)]
        {
            let metadata = tokio::fs::metadata(&self.path)
                .await
                .map_err(StorageError::Io)?;
            let mut perms = metadata.permissions();
            perms.set_mode(0o600);
            tokio::fs::set_permissions(&self.path, perms)
                .await
                .map_err(StorageError::Io)?;
        }

        debug!(path = %self.path.display(), "Persisted session");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        if self.path.exists() {
            tokio::fs::remove_file(&self.path)
                .await
                .map_err(StorageError::Io)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::User;

    fn sample_session() -> PersistedSession {
        PersistedSession {
            is_authenticated: true,
            user: Some(User::new("u1", "Alice", "alice")),
            access_token: Some("A1".to_string()),
            refresh_token: Some("R1".to_string()),
        }
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::in_dir(dir.path());

        assert!(storage.load().await.unwrap().is_none());

        let session = sample_session();
        storage.save(&session).await.unwrap();

        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn clear_removes_record() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::in_dir(dir.path());

        storage.save(&sample_session()).await.unwrap();
        storage.clear().await.unwrap();
        assert!(storage.load().await.unwrap().is_none());

        // Clearing again is a no-op
        storage.clear().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn session_file_is_private() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::in_dir(dir.path());

        storage.save(&sample_session()).await.unwrap();

        let mode = std::fs::metadata(storage.path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn load_rejects_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::in_dir(dir.path());

        tokio::fs::write(storage.path(), "not json").await.unwrap();
        assert!(storage.load().await.is_err());
    }
}
