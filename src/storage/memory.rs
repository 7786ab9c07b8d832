//! In-memory session storage.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::Result;

use super::{PersistedSession, SessionStorage};

/// Session storage held in process memory.
///
/// Useful for tests and for callers who do not want sessions to outlive
/// the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<PersistedSession>>,
}

impl MemoryStorage {
    /// Create an empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory storage pre-populated with a session record.
    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }

    /// Returns a copy of the currently stored record, if any.
    pub fn stored(&self) -> Option<PersistedSession> {
        self.slot.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<PersistedSession>> {
        Ok(self.slot.lock().unwrap().clone())
    }

    async fn save(&self, session: &PersistedSession) -> Result<()> {
        *self.slot.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip() {
        let storage = MemoryStorage::new();
        assert!(storage.load().await.unwrap().is_none());

        let session = PersistedSession {
            is_authenticated: false,
            user: None,
            access_token: Some("A1".to_string()),
            refresh_token: None,
        };
        storage.save(&session).await.unwrap();
        assert_eq!(storage.load().await.unwrap(), Some(session));

        storage.clear().await.unwrap();
        assert!(storage.load().await.unwrap().is_none());
    }
}
