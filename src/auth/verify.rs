//! Server-side session verification with a staleness cache.
//!
//! The request wrapper's 401-driven refresh is the primary recovery path;
//! verification is defense in depth for the idle case where a session has
//! become invalid but no request happens to trigger a 401 (for example
//! route guarding on navigation).

use std::sync::Mutex;
use std::time::Duration;

use reqwest::Method;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::api::HttpClient;
use crate::api::endpoints::VERIFY_SESSION;

use super::store::SessionStore;

/// Outcome of a session verification check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    /// The server accepted the current access token.
    Valid,
    /// The server rejected the session, or no session is present.
    Invalid,
    /// The check could not be completed (transport failure).
    Error,
}

/// A verification result with staleness metadata.
#[derive(Debug, Clone, Copy)]
pub struct Verification {
    /// The verification outcome.
    pub status: VerificationStatus,
    /// When the underlying network check was made.
    pub checked_at: Instant,
    /// Whether this result was served from the cache window.
    pub cached: bool,
}

struct CachedResult {
    status: VerificationStatus,
    checked_at: Instant,
}

/// Confirms the session is still accepted server-side, at most once per
/// cache window.
pub(crate) struct SessionVerifier {
    http: HttpClient,
    store: SessionStore,
    ttl: Duration,
    cache: Mutex<Option<CachedResult>>,
    // Serializes the network check; concurrent cache misses collapse into
    // one call, with the rest served from the cache the first one fills.
    check: tokio::sync::Mutex<()>,
}

impl SessionVerifier {
    pub(crate) fn new(http: HttpClient, store: SessionStore, ttl: Duration) -> Self {
        Self {
            http,
            store,
            ttl,
            cache: Mutex::new(None),
            check: tokio::sync::Mutex::new(()),
        }
    }

    /// Check whether the session is still valid server-side.
    ///
    /// The network call only happens when the store is authenticated, an
    /// access token is present, and the last result is older than the cache
    /// window. `Invalid` and `Error` outcomes force a logout.
    #[instrument(skip(self))]
    pub(crate) async fn verify(&self) -> Verification {
        let token = match self.store.access_token() {
            Some(token) if self.store.is_authenticated() => token,
            _ => {
                return Verification {
                    status: VerificationStatus::Invalid,
                    checked_at: Instant::now(),
                    cached: false,
                };
            }
        };

        if let Some(hit) = self.cached() {
            return hit;
        }

        let _leader = self.check.lock().await;

        // Another caller may have completed a check while we waited
        if let Some(hit) = self.cached() {
            return hit;
        }

        debug!("Verifying session with server");
        let status = match self
            .http
            .send(Method::GET, VERIFY_SESSION, None::<&()>, Some(&token))
            .await
        {
            Ok(response) if response.status().is_success() => VerificationStatus::Valid,
            Ok(response) => {
                debug!(status = %response.status(), "Session rejected by server");
                VerificationStatus::Invalid
            }
            Err(e) => {
                warn!(error = %e, "Session verification request failed");
                VerificationStatus::Error
            }
        };

        let checked_at = Instant::now();
        *self.cache.lock().unwrap() = Some(CachedResult { status, checked_at });

        if status != VerificationStatus::Valid {
            warn!(?status, "Session verification failed, logging out");
            self.store.logout().await;
        }

        Verification {
            status,
            checked_at,
            cached: false,
        }
    }

    /// The last result, if it is still inside the cache window.
    fn cached(&self) -> Option<Verification> {
        let cache = self.cache.lock().unwrap();
        let cached = cache.as_ref()?;
        if Instant::now().duration_since(cached.checked_at) < self.ttl {
            debug!("Verification served from cache");
            Some(Verification {
                status: cached.status,
                checked_at: cached.checked_at,
                cached: true,
            })
        } else {
            None
        }
    }
}
