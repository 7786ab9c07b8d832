//! API endpoint definitions and request/response types.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Endpoint Paths
// ============================================================================

/// POST /user (account registration)
pub const REGISTER: &str = "/user";

/// POST /login (form-encoded credentials)
pub const LOGIN: &str = "/login";

/// POST /auth/refresh
pub const REFRESH_TOKEN: &str = "/auth/refresh";

/// GET /auth/verify
pub const VERIFY_SESSION: &str = "/auth/verify";

/// POST /api/message
pub const CREATE_MESSAGE: &str = "/api/message";

/// GET /api/channels/{channel_id}
pub fn channel_path(channel_id: &str) -> String {
    format!("/api/channels/{}", channel_id)
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Parameters for registering an account.
///
/// Serialized as the registration request body; the password is redacted in
/// `Debug` like the other credential-bearing types.
#[derive(Clone, Serialize)]
pub struct NewAccount {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub description: Option<String>,
}

impl NewAccount {
    pub fn new(
        name: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            username: username.into(),
            email: email.into(),
            password: password.into(),
            description: None,
        }
    }

    /// Attach a profile description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("description", &self.description)
            .finish()
    }
}

/// A registered account, as returned by the registration endpoint.
///
/// Registration does not log in; follow it with
/// [`Client::login`](crate::Client::login).
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Form body for the login endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct LoginForm<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response from the login endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub id: String,
    pub name: String,
    pub username: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[allow(dead_code)]
    pub token_type: String,
}

/// Request body for the refresh endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response from the refresh endpoint.
///
/// The server echoes a refresh token; whether it is adopted (rotation) is
/// controlled by [`ClientConfig::rotate_refresh_token`](crate::ClientConfig).
#[derive(Debug, Deserialize)]
pub(crate) struct RefreshTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[allow(dead_code)]
    pub token_type: String,
    #[allow(dead_code)]
    pub expires_in: u64,
}

/// Error body returned by the server on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}

/// A channel with its message history.
#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: String,
    pub guild_id: String,
    pub name: String,
    pub messages: Vec<Message>,
}

/// A message in a channel.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(default)]
    pub referenced_message_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Parameters for posting a new message.
///
/// The sending user is taken from the current session.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub channel_id: String,
    pub kind: String,
    pub content: String,
    pub referenced_message_id: Option<String>,
}

impl NewMessage {
    /// A plain text message for a channel.
    pub fn text(channel_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            kind: "text".to_string(),
            content: content.into(),
            referenced_message_id: None,
        }
    }
}

/// Wire body for message creation.
#[derive(Debug, Serialize)]
pub(crate) struct MessageCreateRequest<'a> {
    pub channel_id: &'a str,
    pub user_id: &'a str,
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub content: &'a str,
    pub referenced_message_id: Option<&'a str>,
}
