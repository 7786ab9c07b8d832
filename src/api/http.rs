//! HTTP transport and the authenticated request wrapper.

use std::sync::Arc;

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};

use crate::auth::refresh::RefreshCoordinator;
use crate::auth::store::SessionStore;
use crate::auth::tokens::AccessToken;
use crate::error::{Error, ProtocolError};
use crate::types::ServerUrl;

use super::endpoints::ApiErrorBody;

/// Plain HTTP transport for the chat server API.
///
/// Knows nothing about sessions; callers supply the bearer token, if any.
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: reqwest::Client,
    server: ServerUrl,
}

impl HttpClient {
    /// Create a new client for the given server.
    pub(crate) fn new(server: ServerUrl) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("chirp/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");

        Self { client, server }
    }

    /// Issue a request, optionally with a JSON body and a bearer token.
    #[instrument(skip(self, body, token), fields(server = %self.server))]
    pub(crate) async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&AccessToken>,
    ) -> Result<reqwest::Response, Error>
    where
        B: Serialize + ?Sized,
    {
        let url = self.server.endpoint(path);
        debug!(%method, path, authed = token.is_some(), "API request");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token.as_str()));
        }

        Ok(request.send().await?)
    }

    /// POST a form-encoded body and decode the JSON response.
    ///
    /// Used for the login endpoint, which takes OAuth2-style form fields.
    #[instrument(skip(self, form), fields(server = %self.server))]
    pub(crate) async fn post_form<F, R>(&self, path: &str, form: &F) -> Result<R, Error>
    where
        F: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.server.endpoint(path);
        debug!(path, "API form post");

        let response = self.client.post(&url).form(form).send().await?;
        self.handle_response(response).await
    }

    /// Decode a response body, or turn a non-2xx status into a protocol error.
    pub(crate) async fn handle_response<R: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<R, Error> {
        let status = response.status();
        trace!(status = %status, "API response");

        if status.is_success() {
            let body = response.json::<R>().await?;
            Ok(body)
        } else {
            let error = parse_error_response(response).await;
            Err(Error::Protocol(error))
        }
    }
}

/// Parse a non-2xx response into a [`ProtocolError`], extracting the
/// server's `{detail}` body when present.
pub(crate) async fn parse_error_response(response: reqwest::Response) -> ProtocolError {
    let status = response.status().as_u16();

    match response.json::<ApiErrorBody>().await {
        Ok(body) => ProtocolError::new(status, body.detail),
        Err(_) => ProtocolError::new(status, None),
    }
}

/// The authenticated request wrapper.
///
/// Attaches the session's access token to every request and transparently
/// recovers from authorization failures: a 401 with a refresh token present
/// engages the refresh coordinator and retries the request exactly once with
/// the new token. A second 401 after a successful refresh is returned as an
/// ordinary protocol error, never a second refresh for that request.
#[derive(Clone)]
pub(crate) struct AuthedClient {
    http: HttpClient,
    store: SessionStore,
    refresh: Arc<RefreshCoordinator>,
}

impl AuthedClient {
    pub(crate) fn new(
        http: HttpClient,
        store: SessionStore,
        refresh: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            http,
            store,
            refresh,
        }
    }

    /// GET a protected resource and decode the JSON response.
    pub(crate) async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, Error> {
        let response = self.send(Method::GET, path, None::<&()>).await?;
        self.http.handle_response(response).await
    }

    /// POST a JSON body to a protected resource and decode the response.
    pub(crate) async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, Error>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.send(Method::POST, path, Some(body)).await?;
        self.http.handle_response(response).await
    }

    /// Issue a request with the current access token, refreshing on 401.
    ///
    /// An absent access token sends the request unauthenticated; the server
    /// decides whether the endpoint requires auth. Non-401 responses pass
    /// through untouched, success and failure alike.
    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, Error>
    where
        B: Serialize + ?Sized,
    {
        let token = self.store.access_token();
        let response = self
            .http
            .send(method.clone(), path, body, token.as_ref())
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        if self.store.refresh_token().is_none() {
            // Authentication cannot be recovered; surface the 401 as-is.
            debug!(path, "401 with no refresh token, not refreshing");
            return Ok(response);
        }

        debug!(path, "401 received, refreshing access token");
        let new_token = self
            .refresh
            .refresh(token.as_ref())
            .await
            .map_err(Error::Auth)?;

        // One retry with the refreshed token. If this also comes back 401,
        // it is returned unmodified: no second refresh cycle per request.
        let retried = self
            .http
            .send(method, path, body, Some(&new_token))
            .await?;
        Ok(retried)
    }
}
