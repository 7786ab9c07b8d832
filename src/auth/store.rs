//! Session state storage.
//!
//! The [`SessionStore`] is the single holder of authentication state for a
//! client: the logged-in user, the access token, and the refresh token.
//! Every mutation flushes the full record to durable storage; persistence
//! failures are logged and swallowed so that session changes are never
//! blocked on the storage backend.

use std::sync::{Arc, RwLock};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::storage::{PersistedSession, SessionStorage};
use crate::types::User;

use super::tokens::{AccessToken, RefreshToken};

/// Holder of the client's authentication state.
///
/// Cheap to clone (internal `Arc`); all clones observe the same session.
/// Reads never block on I/O, and no partially-updated state is ever
/// observable: each mutation swaps the full record under a lock that is
/// never held across an await point.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: RwLock<SessionState>,
    storage: Arc<dyn SessionStorage>,
    auth_tx: watch::Sender<bool>,
}

#[derive(Default)]
struct SessionState {
    user: Option<User>,
    access_token: Option<AccessToken>,
    refresh_token: Option<RefreshToken>,
}

impl SessionState {
    fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            is_authenticated: self.is_authenticated(),
            user: self.user.clone(),
            access_token: self.access_token.as_ref().map(|t| t.as_str().to_string()),
            refresh_token: self.refresh_token.as_ref().map(|t| t.as_str().to_string()),
        }
    }
}

impl SessionStore {
    /// Create an empty session store backed by the given storage.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let (auth_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(SessionState::default()),
                storage,
                auth_tx,
            }),
        }
    }

    /// Rehydrate the session from durable storage.
    ///
    /// Returns `true` if a persisted session was restored. A missing or
    /// unreadable record leaves the store empty; read failures are logged,
    /// not propagated, matching the store's fire-and-forget durability.
    pub async fn hydrate(&self) -> bool {
        match self.inner.storage.load().await {
            Ok(Some(persisted)) => {
                {
                    let mut state = self.inner.state.write().unwrap();
                    state.user = persisted.user;
                    state.access_token = persisted.access_token.map(AccessToken::new);
                    state.refresh_token = persisted.refresh_token.map(RefreshToken::new);
                }
                self.notify();
                debug!("Session rehydrated from storage");
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Failed to load persisted session, starting empty");
                false
            }
        }
    }

    /// Replace the entire session after a successful login.
    pub async fn set_auth(
        &self,
        user: User,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
    ) {
        let snapshot = {
            let mut state = self.inner.state.write().unwrap();
            state.user = Some(user);
            state.access_token = Some(AccessToken::new(access_token));
            state.refresh_token = refresh_token.map(RefreshToken::new);
            state.to_persisted()
        };
        self.notify();
        self.persist(&snapshot).await;
    }

    /// Clear the session.
    ///
    /// Idempotent: clearing an already-empty session changes nothing.
    pub async fn logout(&self) {
        if self.clear_now() {
            self.clear_persisted().await;
        }
    }

    /// Whether a user identity is present.
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.read().unwrap().is_authenticated()
    }

    /// The logged-in user, if any.
    pub fn user(&self) -> Option<User> {
        self.inner.state.read().unwrap().user.clone()
    }

    /// A full snapshot of the session, in its persisted shape.
    pub fn snapshot(&self) -> PersistedSession {
        self.inner.state.read().unwrap().to_persisted()
    }

    /// Observe the authenticated flag.
    ///
    /// Route-guarding code can watch this to react to forced logouts
    /// (for example a failed refresh) without polling the store.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.auth_tx.subscribe()
    }

    pub(crate) fn access_token(&self) -> Option<AccessToken> {
        self.inner.state.read().unwrap().access_token.clone()
    }

    pub(crate) fn refresh_token(&self) -> Option<RefreshToken> {
        self.inner.state.read().unwrap().refresh_token.clone()
    }

    /// Install a refreshed access token, returning the snapshot to persist.
    ///
    /// Synchronous so the refresh coordinator can settle (store update, flag
    /// reset, queue drain) without an intervening suspension point.
    pub(crate) fn apply_access_token(&self, token: AccessToken) -> PersistedSession {
        let mut state = self.inner.state.write().unwrap();
        state.access_token = Some(token);
        state.to_persisted()
    }

    /// Install a refreshed access token plus a rotated refresh token.
    pub(crate) fn apply_rotated_tokens(
        &self,
        access: AccessToken,
        refresh: RefreshToken,
    ) -> PersistedSession {
        let mut state = self.inner.state.write().unwrap();
        state.access_token = Some(access);
        state.refresh_token = Some(refresh);
        state.to_persisted()
    }

    /// Clear the session synchronously, returning whether anything was held.
    ///
    /// Used by the refresh coordinator's failure settlement; the caller is
    /// responsible for clearing durable storage afterwards.
    pub(crate) fn clear_now(&self) -> bool {
        let held = {
            let mut state = self.inner.state.write().unwrap();
            let held = state.is_authenticated()
                || state.access_token.is_some()
                || state.refresh_token.is_some();
            *state = SessionState::default();
            held
        };
        self.notify();
        held
    }

    /// Flush a snapshot to durable storage, swallowing failures.
    pub(crate) async fn persist(&self, snapshot: &PersistedSession) {
        if let Err(e) = self.inner.storage.save(snapshot).await {
            warn!(error = %e, "Failed to persist session");
        }
    }

    /// Remove the durable record, swallowing failures.
    pub(crate) async fn clear_persisted(&self) {
        if let Err(e) = self.inner.storage.clear().await {
            warn!(error = %e, "Failed to clear persisted session");
        }
    }

    fn notify(&self) {
        let authed = self.is_authenticated();
        self.inner.auth_tx.send_replace(authed);
    }
}

// Custom Debug impl that hides tokens
impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read().unwrap();
        f.debug_struct("SessionStore")
            .field("user", &state.user)
            .field("tokens", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn store_with_memory() -> (SessionStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (SessionStore::new(storage.clone()), storage)
    }

    fn alice() -> User {
        User::new("u1", "Alice", "alice")
    }

    #[tokio::test]
    async fn set_auth_populates_everything() {
        let (store, storage) = store_with_memory();

        store
            .set_auth(alice(), "A1", Some("R1".to_string()))
            .await;

        let snapshot = store.snapshot();
        assert!(snapshot.is_authenticated);
        assert_eq!(snapshot.user, Some(alice()));
        assert_eq!(snapshot.access_token.as_deref(), Some("A1"));
        assert_eq!(snapshot.refresh_token.as_deref(), Some("R1"));

        // Every mutation is flushed to storage
        assert_eq!(storage.stored(), Some(snapshot));
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let (store, storage) = store_with_memory();

        store
            .set_auth(alice(), "A1", Some("R1".to_string()))
            .await;
        store.logout().await;

        let snapshot = store.snapshot();
        assert!(!snapshot.is_authenticated);
        assert!(snapshot.user.is_none());
        assert!(snapshot.access_token.is_none());
        assert!(snapshot.refresh_token.is_none());
        assert!(storage.stored().is_none());
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let (store, _storage) = store_with_memory();

        store.logout().await;
        store.logout().await;

        assert!(!store.is_authenticated());
        assert_eq!(store.snapshot(), PersistedSession::default());
    }

    #[tokio::test]
    async fn hydrate_restores_persisted_session() {
        let storage = Arc::new(MemoryStorage::with_session(PersistedSession {
            is_authenticated: true,
            user: Some(alice()),
            access_token: Some("A1".to_string()),
            refresh_token: Some("R1".to_string()),
        }));
        let store = SessionStore::new(storage);

        assert!(store.hydrate().await);
        assert!(store.is_authenticated());
        assert_eq!(store.user(), Some(alice()));
        assert_eq!(store.access_token().unwrap().as_str(), "A1");
    }

    #[tokio::test]
    async fn hydrate_with_empty_storage_stays_logged_out() {
        let (store, _storage) = store_with_memory();
        assert!(!store.hydrate().await);
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn watch_observes_login_and_logout() {
        let (store, _storage) = store_with_memory();
        let rx = store.subscribe();

        assert!(!*rx.borrow());
        store
            .set_auth(alice(), "A1", Some("R1".to_string()))
            .await;
        assert!(*rx.borrow());

        store.logout().await;
        assert!(!*rx.borrow());
    }

    #[tokio::test]
    async fn store_debug_hides_tokens() {
        let (store, _storage) = store_with_memory();
        store
            .set_auth(alice(), "very-secret-access", Some("very-secret-refresh".to_string()))
            .await;

        let debug = format!("{:?}", store);
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
