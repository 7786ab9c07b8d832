//! Client configuration.

use std::time::Duration;

/// Tunables for a [`Client`](crate::Client).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use chirp::ClientConfig;
///
/// let config = ClientConfig::default()
///     .verify_cache_ttl(Duration::from_secs(60))
///     .rotate_refresh_token(true);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub(crate) verify_cache_ttl: Duration,
    pub(crate) rotate_refresh_token: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            // Verification results are reused for five minutes so that
            // navigation-driven checks do not hit the network every time.
            verify_cache_ttl: Duration::from_secs(300),
            rotate_refresh_token: false,
        }
    }
}

impl ClientConfig {
    /// How long a session verification result is reused before a new
    /// network check is made. Default: 5 minutes.
    pub fn verify_cache_ttl(mut self, ttl: Duration) -> Self {
        self.verify_cache_ttl = ttl;
        self
    }

    /// Whether to adopt the refresh token echoed by the refresh endpoint.
    ///
    /// The server currently returns the same refresh token it was given, so
    /// this defaults to off; turn it on if the server starts rotating.
    pub fn rotate_refresh_token(mut self, rotate: bool) -> Self {
        self.rotate_refresh_token = rotate;
        self
    }
}
