//! Single-flight token refresh coordination.
//!
//! Many concurrent requests can hit a 401 at the same moment when an access
//! token expires. The [`RefreshCoordinator`] guarantees at most one
//! outstanding refresh call: the first caller becomes the leader and issues
//! the HTTP call, everyone else parks on a oneshot and receives the exact
//! outcome the leader observed.

use std::sync::Mutex;

use reqwest::Method;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use crate::api::endpoints::{REFRESH_TOKEN, RefreshTokenRequest, RefreshTokenResponse};
use crate::api::{HttpClient, parse_error_response};
use crate::error::AuthError;

use super::store::SessionStore;
use super::tokens::{AccessToken, RefreshToken};

type RefreshOutcome = Result<AccessToken, AuthError>;

/// Serializes token refresh across all callers of one client.
pub(crate) struct RefreshCoordinator {
    http: HttpClient,
    store: SessionStore,
    rotate_refresh_token: bool,
    state: Mutex<RefreshState>,
}

/// The in-flight flag and wait queue.
///
/// Only ever mutated inside synchronous critical sections; the lock is never
/// held across an await point. That is what makes the check-and-set below
/// atomic with respect to every other caller.
#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Holds the leader's claim on the in-flight flag.
///
/// The leader's future can be dropped at its await point (caller timeout,
/// task abort). If that happens before [`settle`](Leadership::settle) runs,
/// `Drop` releases the flag and fails the queued waiters, so the next 401
/// can elect a new leader instead of parking behind a refresh that will
/// never finish.
struct Leadership<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl Leadership<'_> {
    /// Reset the flag and take the wait queue, in one critical section.
    fn settle(&mut self) -> Vec<oneshot::Sender<RefreshOutcome>> {
        self.settled = true;
        let mut state = self.coordinator.state.lock().unwrap();
        state.in_flight = false;
        std::mem::take(&mut state.waiters)
    }
}

impl Drop for Leadership<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let waiters = {
            let mut state = self.coordinator.state.lock().unwrap();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        warn!(waiters = waiters.len(), "Refresh abandoned before settling");
        for waiter in waiters {
            let _ = waiter.send(Err(AuthError::RefreshFailed {
                status: None,
                detail: Some("refresh was abandoned".to_string()),
            }));
        }
    }
}

impl RefreshCoordinator {
    pub(crate) fn new(http: HttpClient, store: SessionStore, rotate_refresh_token: bool) -> Self {
        Self {
            http,
            store,
            rotate_refresh_token,
            state: Mutex::new(RefreshState::default()),
        }
    }

    /// Obtain a fresh access token, joining an in-flight refresh if one exists.
    ///
    /// `stale` is the access token the caller just saw rejected. If the
    /// store already holds a different token, a refresh settled while the
    /// caller's failed request was in the air; that token is returned
    /// without another round-trip.
    ///
    /// On success the session store already holds the new token. On failure
    /// the session has been cleared: a refresh token the server rejects means
    /// authentication cannot be recovered without a new login.
    #[instrument(skip_all)]
    pub(crate) async fn refresh(&self, stale: Option<&AccessToken>) -> RefreshOutcome {
        let Some(refresh_token) = self.store.refresh_token() else {
            return Err(AuthError::RefreshTokenMissing);
        };

        enum Entry {
            Fresh(AccessToken),
            Wait(oneshot::Receiver<RefreshOutcome>),
            Lead,
        }

        let entry = {
            let mut state = self.state.lock().unwrap();
            if state.in_flight {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Entry::Wait(rx)
            } else if let Some(current) = self
                .store
                .access_token()
                .filter(|current| stale.is_some_and(|s| s.as_str() != current.as_str()))
            {
                Entry::Fresh(current)
            } else {
                state.in_flight = true;
                Entry::Lead
            }
        };

        match entry {
            Entry::Fresh(token) => {
                debug!("Token already refreshed by another caller");
                return Ok(token);
            }
            Entry::Wait(rx) => {
                debug!("Refresh already in flight, waiting for its outcome");
                return match rx.await {
                    Ok(outcome) => outcome,
                    // Only possible if the coordinator itself was dropped;
                    // a dropped leader sends this outcome explicitly.
                    Err(_) => Err(AuthError::RefreshFailed {
                        status: None,
                        detail: Some("refresh was abandoned".to_string()),
                    }),
                };
            }
            Entry::Lead => {}
        }

        let mut leadership = Leadership {
            coordinator: self,
            settled: false,
        };

        info!("Refreshing access token");
        let result = self.call_refresh_endpoint(refresh_token.as_str()).await;

        // Settlement: store update, flag reset, and queue drain all happen
        // without an intervening suspension point, then every waiter receives
        // the same outcome as the leader.
        let (outcome, snapshot) = match result {
            Ok(response) => {
                let access = AccessToken::new(response.access_token);
                let rotated = response
                    .refresh_token
                    .filter(|_| self.rotate_refresh_token)
                    .map(RefreshToken::new);
                let snapshot = match rotated {
                    Some(refresh) => self.store.apply_rotated_tokens(access.clone(), refresh),
                    None => self.store.apply_access_token(access.clone()),
                };
                debug!("Access token refreshed");
                (Ok(access), Some(snapshot))
            }
            Err(failure) => {
                warn!(error = %failure, "Token refresh failed, clearing session");
                self.store.clear_now();
                (Err(failure), None)
            }
        };

        let waiters = leadership.settle();
        debug!(waiters = waiters.len(), "Releasing refresh waiters");
        for waiter in waiters {
            // A waiter may have been dropped; that is its problem, not ours.
            let _ = waiter.send(outcome.clone());
        }

        // Durability after settlement; failures are logged, never propagated.
        match &snapshot {
            Some(snapshot) => self.store.persist(snapshot).await,
            None => self.store.clear_persisted().await,
        }

        outcome
    }

    async fn call_refresh_endpoint(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshTokenResponse, AuthError> {
        let request = RefreshTokenRequest { refresh_token };

        let response = self
            .http
            .send(Method::POST, REFRESH_TOKEN, Some(&request), None)
            .await
            .map_err(|e| AuthError::RefreshFailed {
                status: None,
                detail: Some(e.to_string()),
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = parse_error_response(response).await;
            return Err(AuthError::RefreshFailed {
                status: Some(err.status),
                detail: err.detail,
            });
        }

        response
            .json::<RefreshTokenResponse>()
            .await
            .map_err(|e| AuthError::RefreshFailed {
                status: Some(status.as_u16()),
                detail: Some(e.to_string()),
            })
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("RefreshCoordinator")
            .field("in_flight", &state.in_flight)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::storage::MemoryStorage;
    use crate::types::{ServerUrl, User};

    fn coordinator_with_store() -> (RefreshCoordinator, SessionStore) {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        // Never contacted by these tests
        let http = HttpClient::new(ServerUrl::new("https://chat.example.invalid").unwrap());
        (
            RefreshCoordinator::new(http, store.clone(), false),
            store,
        )
    }

    #[tokio::test]
    async fn missing_refresh_token_fails_without_network() {
        let (coordinator, _store) = coordinator_with_store();

        let err = coordinator.refresh(None).await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshTokenMissing));
    }

    #[tokio::test]
    async fn stale_token_reuses_already_settled_refresh() {
        let (coordinator, store) = coordinator_with_store();
        store
            .set_auth(
                User::new("u1", "Alice", "alice"),
                "A2",
                Some("R1".to_string()),
            )
            .await;

        // The caller failed with A1, but the store has already moved on
        let stale = AccessToken::new("A1");
        let token = coordinator.refresh(Some(&stale)).await.unwrap();
        assert_eq!(token.as_str(), "A2");
    }

    #[tokio::test]
    async fn dropped_leadership_releases_flag_and_waiters() {
        let (coordinator, _store) = coordinator_with_store();

        // Claim leadership and park a waiter, as refresh() would
        let leadership = Leadership {
            coordinator: &coordinator,
            settled: false,
        };
        let rx = {
            let mut state = coordinator.state.lock().unwrap();
            state.in_flight = true;
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            rx
        };

        drop(leadership);

        let outcome = rx.await.expect("waiter must be notified");
        assert!(matches!(outcome, Err(AuthError::RefreshFailed { .. })));
        assert!(!coordinator.state.lock().unwrap().in_flight);
    }
}
