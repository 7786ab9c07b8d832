//! Opaque token newtypes.
//!
//! Both tokens redact their value in `Debug`, so session state can be logged
//! without leaking credentials. The raw string is only reachable through
//! `as_str`, which stays crate-private.

use std::fmt;

/// Short-lived bearer token attached to protected requests.
#[derive(Clone)]
pub struct AccessToken(pub(crate) String);

/// Long-lived token used solely to mint new access tokens.
#[derive(Clone)]
pub struct RefreshToken(pub(crate) String);

impl AccessToken {
    pub(crate) fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl RefreshToken {
    pub(crate) fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&"[REDACTED]").finish()
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefreshToken").field(&"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_never_contains_token_values() {
        let access = AccessToken::new("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...");
        let refresh = RefreshToken::new("refresh_token_value_here");

        let access_debug = format!("{access:?}");
        assert!(!access_debug.contains("eyJ"));
        assert!(access_debug.contains("[REDACTED]"));

        let refresh_debug = format!("{refresh:?}");
        assert!(!refresh_debug.contains("value_here"));
        assert!(refresh_debug.contains("[REDACTED]"));
    }
}
