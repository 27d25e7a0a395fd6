use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, SliceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Authenticated call against the open API.
///
/// Implementations build the request from `path`, `body` and `query`,
/// attach the bearer token when `with_auth` is set, and return the decoded
/// envelope's `data` field.
///
/// # Errors
///
/// - [`ApiError::Api`] when the envelope's `code` is non-zero
/// - [`ApiError::Transport`] on non-200 status or network failure
/// - [`ApiError::Protocol`] when the body is not a JSON envelope
pub trait ApiClient: Send + Sync {
    fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        query: &[(&str, String)],
        with_auth: bool,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;
}

/// Single-attempt PUT of one slice to a pre-signed URL.
///
/// No authentication header is sent; the URL carries its own authorization.
/// Success is HTTP 200 or 204. Implementations must not retry.
pub trait SliceTransport: Send + Sync {
    fn put_slice(
        &self,
        url: &str,
        payload: Bytes,
    ) -> impl Future<Output = Result<(), SliceError>> + Send;
}

impl<A: ApiClient> ApiClient for &A {
    fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        query: &[(&str, String)],
        with_auth: bool,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send {
        (**self).call(method, path, body, query, with_auth)
    }
}

impl<A: ApiClient> ApiClient for Arc<A> {
    fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        query: &[(&str, String)],
        with_auth: bool,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send {
        (**self).call(method, path, body, query, with_auth)
    }
}

impl<T: SliceTransport> SliceTransport for Arc<T> {
    fn put_slice(
        &self,
        url: &str,
        payload: Bytes,
    ) -> impl Future<Output = Result<(), SliceError>> + Send {
        (**self).put_slice(url, payload)
    }
}

/// Authenticated POST with a typed body and response.
pub(crate) async fn post<A, B, R>(api: &A, path: &str, body: &B) -> Result<R, ApiError>
where
    A: ApiClient,
    B: Serialize,
    R: DeserializeOwned,
{
    let body = serde_json::to_value(body)?;
    let data = api.call(Method::Post, path, Some(body), &[], true).await?;
    Ok(serde_json::from_value(data)?)
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::sync::RwLock;
    use std::sync::atomic::{AtomicBool, Ordering};

    use reqwest::header::USER_AGENT;
    use tracing::{debug, warn};

    use super::*;
    use crate::core::decode_envelope;
    use crate::data::ClientConfig;
    use crate::data::wire::{AccessTokenRequest, AccessTokenResponse, paths};

    fn build_http(config: &ClientConfig) -> Result<reqwest::Client, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(|e| ApiError::Transport { status: None, message: e.to_string() })
    }

    fn transport(e: reqwest::Error) -> ApiError {
        ApiError::Transport {
            status:  e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// Production [`ApiClient`] for the open API.
    ///
    /// When client credentials are configured, a call rejected with code 401
    /// triggers one [`login`](Self::login) and exactly one retry.
    pub struct OpenApiClient {
        http:      reqwest::Client,
        config:    ClientConfig,
        token:     RwLock<Option<String>>,
        refreshed: AtomicBool,
    }

    impl OpenApiClient {
        pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
            Ok(Self {
                http: build_http(&config)?,
                token: RwLock::new(config.access_token.clone().filter(|t| !t.is_empty())),
                refreshed: AtomicBool::new(false),
                config,
            })
        }

        pub fn config(&self) -> &ClientConfig { &self.config }

        pub fn access_token(&self) -> Option<String> {
            self.token.read().ok().and_then(|t| t.clone())
        }

        pub fn set_access_token(&self, token: impl Into<String>) {
            if let Ok(mut slot) = self.token.write() {
                *slot = Some(token.into());
            }
        }

        /// Whether the token was refreshed since the last call, resetting the flag.
        pub fn take_token_refreshed(&self) -> bool { self.refreshed.swap(false, Ordering::AcqRel) }

        /// Exchange the client id/secret for a new access token and keep it.
        pub async fn login(&self) -> Result<AccessTokenResponse, ApiError> {
            let (Some(client_id), Some(client_secret)) =
                (self.config.client_id.as_deref(), self.config.client_secret.as_deref())
            else {
                return Err(ApiError::MissingCredentials);
            };
            if client_id.is_empty() || client_secret.is_empty() {
                return Err(ApiError::MissingCredentials);
            }
            let body = serde_json::to_value(AccessTokenRequest { client_id, client_secret })?;
            let data = self
                .call_once(Method::Post, paths::ACCESS_TOKEN, Some(&body), &[], false)
                .await?;
            let token: AccessTokenResponse = serde_json::from_value(data)?;
            self.set_access_token(token.access_token.clone());
            debug!(expired_at = %token.expired_at, "access token acquired");
            Ok(token)
        }

        async fn call_once(
            &self,
            method: Method,
            path: &str,
            body: Option<&Value>,
            query: &[(&str, String)],
            with_auth: bool,
        ) -> Result<Value, ApiError> {
            let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
            let mut request = match method {
                Method::Get => self.http.get(&url),
                Method::Post => self.http.post(&url),
            };
            request = request
                .header("Platform", &self.config.platform)
                .header(USER_AGENT, &self.config.user_agent);
            if with_auth && let Some(token) = self.access_token() {
                request = request.bearer_auth(token);
            }
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            debug!(?method, path, "api call");
            let response = request.send().await.map_err(transport)?;
            let status = response.status().as_u16();
            let bytes = response.bytes().await.map_err(transport)?;
            decode_envelope(status, &bytes)
        }
    }

    impl ApiClient for OpenApiClient {
        async fn call(
            &self,
            method: Method,
            path: &str,
            body: Option<Value>,
            query: &[(&str, String)],
            with_auth: bool,
        ) -> Result<Value, ApiError> {
            match self.call_once(method, path, body.as_ref(), query, with_auth).await {
                Err(e) if e.is_unauthorized() && with_auth && self.config.can_refresh() => {
                    warn!(path, trace_id = e.trace_id(), "access token rejected, refreshing");
                    self.login().await?;
                    self.refreshed.store(true, Ordering::Release);
                    self.call_once(method, path, body.as_ref(), query, with_auth).await
                }
                result => result,
            }
        }
    }

    /// Production [`SliceTransport`].
    pub struct ReqwestTransport {
        http:       reqwest::Client,
        user_agent: String,
    }

    impl ReqwestTransport {
        pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
            Ok(Self {
                http:       build_http(config)?,
                user_agent: config.user_agent.clone(),
            })
        }
    }

    impl SliceTransport for ReqwestTransport {
        async fn put_slice(&self, url: &str, payload: Bytes) -> Result<(), SliceError> {
            let response = self
                .http
                .put(url)
                .header(USER_AGENT, &self.user_agent)
                .body(payload)
                .send()
                .await
                .map_err(|e| SliceError::Transport(e.to_string()))?;

            match response.status().as_u16() {
                200 | 204 => Ok(()),
                status => Err(SliceError::Status(status)),
            }
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::{OpenApiClient, ReqwestTransport};
