//! User identity type.

use serde::{Deserialize, Serialize};

/// The identity of a logged-in user, as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned user id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Login name.
    pub username: String,
}

impl User {
    /// Create a user identity.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            username: username.into(),
        }
    }
}
