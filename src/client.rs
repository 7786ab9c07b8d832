//! The client facade.

use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::api::endpoints::{
    CREATE_MESSAGE, LOGIN, LoginForm, LoginResponse, MessageCreateRequest, REGISTER, channel_path,
};
use crate::api::{Account, AuthedClient, Channel, HttpClient, Message, NewAccount, NewMessage};
use crate::auth::refresh::RefreshCoordinator;
use crate::auth::verify::SessionVerifier;
use crate::auth::{Credentials, SessionStore, Verification};
use crate::config::ClientConfig;
use crate::error::{AuthError, Error};
use crate::storage::SessionStorage;
use crate::types::{ServerUrl, User};

/// A chat server client with transparent session management.
///
/// The client owns the session store, refreshes expired access tokens behind
/// the scenes, and serializes concurrent refresh attempts so that many
/// simultaneous requests never trigger more than one refresh round-trip.
///
/// Cheap to clone (internal `Arc`s); all clones share one session.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use chirp::{Client, Credentials, ServerUrl};
/// use chirp::storage::MemoryStorage;
///
/// # async fn example() -> Result<(), chirp::Error> {
/// let server = ServerUrl::new("https://chat.example.com")?;
/// let client = Client::new(server, Arc::new(MemoryStorage::new()));
///
/// let user = client.login(Credentials::new("alice", "hunter22")).await?;
/// println!("logged in as {}", user.username);
///
/// let channel = client.channel("42").await?;
/// for message in &channel.messages {
///     println!("{}: {}", message.user_id, message.content);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    http: HttpClient,
    store: SessionStore,
    authed: AuthedClient,
    verifier: Arc<SessionVerifier>,
}

impl Client {
    /// Create a client with default configuration.
    pub fn new(server: ServerUrl, storage: Arc<dyn SessionStorage>) -> Self {
        Self::with_config(server, storage, ClientConfig::default())
    }

    /// Create a client with explicit configuration.
    pub fn with_config(
        server: ServerUrl,
        storage: Arc<dyn SessionStorage>,
        config: ClientConfig,
    ) -> Self {
        let http = HttpClient::new(server);
        let store = SessionStore::new(storage);
        let coordinator = Arc::new(RefreshCoordinator::new(
            http.clone(),
            store.clone(),
            config.rotate_refresh_token,
        ));
        let authed = AuthedClient::new(http.clone(), store.clone(), coordinator);
        let verifier = Arc::new(SessionVerifier::new(
            http.clone(),
            store.clone(),
            config.verify_cache_ttl,
        ));

        Self {
            http,
            store,
            authed,
            verifier,
        }
    }

    /// Rehydrate a persisted session from storage.
    ///
    /// Returns `true` if a session was restored. Call once at startup;
    /// a missing or unreadable record leaves the client logged out.
    pub async fn restore(&self) -> bool {
        self.store.hydrate().await
    }

    /// Register a new account.
    ///
    /// The server does not issue tokens on registration; follow up with
    /// [`Client::login`] using the new username and password.
    ///
    /// # Errors
    ///
    /// A taken username or email surfaces as a 400 protocol error carrying
    /// the server's `detail` message.
    #[instrument(skip(self, account), fields(username = %account.username))]
    pub async fn register(&self, account: NewAccount) -> Result<Account, Error> {
        info!("Registering account");

        let response = self
            .http
            .send(Method::POST, REGISTER, Some(&account), None)
            .await?;
        self.http.handle_response(response).await
    }

    /// Authenticate with the server and populate the session.
    ///
    /// # Errors
    ///
    /// Bad credentials surface as a protocol error carrying the server's
    /// `detail` message; transport failures as a transport error.
    #[instrument(skip(self, credentials), fields(username = %credentials.username()))]
    pub async fn login(&self, credentials: Credentials) -> Result<User, Error> {
        info!("Logging in");

        let form = LoginForm {
            username: credentials.username(),
            password: credentials.password(),
        };
        let response: LoginResponse = self.http.post_form(LOGIN, &form).await?;

        let user = User::new(response.id, response.name, response.username);
        self.store
            .set_auth(user.clone(), response.access_token, response.refresh_token)
            .await;

        debug!(user_id = %user.id, "Login succeeded");
        Ok(user)
    }

    /// Clear the session, locally and in durable storage.
    ///
    /// Idempotent: logging out while logged out is a no-op.
    pub async fn logout(&self) {
        info!("Logging out");
        self.store.logout().await;
    }

    /// Whether a user is currently logged in.
    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    /// The logged-in user, if any.
    pub fn current_user(&self) -> Option<User> {
        self.store.user()
    }

    /// The underlying session store.
    ///
    /// Useful for observing auth state changes via
    /// [`SessionStore::subscribe`].
    pub fn session(&self) -> &SessionStore {
        &self.store
    }

    /// Confirm the session is still valid server-side.
    ///
    /// Results are cached for the configured window; an `Invalid` or `Error`
    /// outcome forces a logout.
    pub async fn verify_session(&self) -> Verification {
        self.verifier.verify().await
    }

    /// Fetch a channel with its message history.
    pub async fn channel(&self, channel_id: &str) -> Result<Channel, Error> {
        self.authed.get_json(&channel_path(channel_id)).await
    }

    /// Post a message as the current user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAuthenticated`] if no user is logged in.
    pub async fn send_message(&self, message: NewMessage) -> Result<Message, Error> {
        let user = self.store.user().ok_or(AuthError::NotAuthenticated)?;

        let request = MessageCreateRequest {
            channel_id: &message.channel_id,
            user_id: &user.id,
            kind: &message.kind,
            content: &message.content,
            referenced_message_id: message.referenced_message_id.as_deref(),
        };
        self.authed.post_json(CREATE_MESSAGE, &request).await
    }

    /// GET an arbitrary protected endpoint through the authenticated wrapper.
    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, Error> {
        self.authed.get_json(path).await
    }

    /// POST to an arbitrary protected endpoint through the authenticated
    /// wrapper.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, Error>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.authed.post_json(path, body).await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
