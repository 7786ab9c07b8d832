//! Durable session storage.
//!
//! This module provides an abstraction over where the session record lives,
//! allowing different backends (filesystem, in-memory) to be used
//! interchangeably. The session store flushes the full record on every
//! mutation and rehydrates it verbatim at startup.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// The durable session record.
///
/// This is the exact shape written to storage on every session mutation
/// and read back at hydration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    /// Whether a user identity is present.
    pub is_authenticated: bool,
    /// The logged-in user, if any.
    pub user: Option<crate::types::User>,
    /// Short-lived API credential.
    pub access_token: Option<String>,
    /// Long-lived credential used only to mint new access tokens.
    pub refresh_token: Option<String>,
}

/// A backend for durable session persistence.
///
/// Implementations hold a single session record under a fixed key.
/// Persistence failures are logged and swallowed by the session store,
/// so implementations should not assume callers will observe errors.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Load the persisted session record, if one exists.
    async fn load(&self) -> Result<Option<PersistedSession>>;

    /// Overwrite the persisted session record.
    async fn save(&self, session: &PersistedSession) -> Result<()>;

    /// Remove the persisted session record.
    async fn clear(&self) -> Result<()>;
}
