//! Shared API client.
//!
//! Every request goes through [`ApiClient::dispatch`], which attaches the
//! stored bearer token on the way out and applies the unauthorized policy on
//! the way back: a 401 on an authenticated call expires the session before
//! the error reaches the caller. All other statuses are returned untouched.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{is_valid_api_url, normalize_api_url, ClientConfig};
use crate::error::ApiError;
use crate::session::Session;

/// Whether a route needs the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Login, registration and health; sent without credentials.
    Public,
    /// Everything else; carries `Authorization: Bearer <token>` when one is stored.
    Authenticated,
}

/// HTTP client bound to one backend and one session.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    /// Create a client for the configured backend.
    pub fn new(config: &ClientConfig, session: Arc<Session>) -> Result<Self, ApiError> {
        let base_url = normalize_api_url(&config.api_url);
        if !is_valid_api_url(&base_url) {
            return Err(ApiError::InvalidUrl(config.api_url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// GET `path` with optional query pairs.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        access: Access,
    ) -> Result<T, ApiError> {
        let mut builder = self.http.get(self.url(path));
        if !query.is_empty() {
            builder = builder.query(query);
        }
        self.dispatch(builder, Method::GET, path, access).await
    }

    /// POST a JSON body to `path`.
    pub async fn post<B, T>(&self, path: &str, body: &B, access: Access) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.http.post(self.url(path)).json(body);
        self.dispatch(builder, Method::POST, path, access).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Attach the bearer token, if any, to an authenticated request.
    fn authorize(&self, builder: RequestBuilder, access: Access) -> (RequestBuilder, bool) {
        if access == Access::Public {
            return (builder, false);
        }
        match self.session.token() {
            Some(token) => (builder.bearer_auth(token), true),
            None => (builder, false),
        }
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        method: Method,
        path: &str,
        access: Access,
    ) -> Result<T, ApiError> {
        let (builder, has_token) = self.authorize(builder, access);
        tracing::debug!(method = %method, path = %path, has_token, "Sending API request");

        let response = builder.send().await.map_err(|e| {
            tracing::debug!(method = %method, path = %path, error = %e, "API request failed");
            ApiError::Transport(e)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED && access == Access::Authenticated {
            tracing::warn!(method = %method, path = %path, "Backend rejected session token");
            if let Err(e) = self.session.expire() {
                tracing::error!(error = %e, "Failed to clear stored credentials");
            }
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(method = %method, path = %path, status = %status, "API request returned error status");
            return Err(ApiError::Http { status, body });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}
