//! HTTP transport adapter backed by `reqwest`.
//!
//! Injects the session credential into every request and maps failures
//! into the uniform error shape. On a 401 the registered observer is
//! signalled, and awaited, before the error reaches the caller; the
//! transport itself never touches session state or storage.

use std::sync::{PoisonError, RwLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::domain::error::{ClientError, Result};
use crate::domain::ports::{Transport, UnauthorizedObserver};
use crate::infrastructure::config::ApiConfig;

/// Error body produced by the marketplace API.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// `reqwest`-based [`Transport`] implementation.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credential: RwLock<Option<String>>,
    observer: RwLock<Option<Weak<dyn UnauthorizedObserver>>>,
}

impl HttpTransport {
    /// Build a transport from the API configuration.
    ///
    /// # Errors
    /// Returns a configuration error when the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ClientError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: normalize_base(&config.base_url),
            credential: RwLock::new(None),
            observer: RwLock::new(None),
        })
    }

    /// Register the observer signalled on 401 responses.
    ///
    /// Held weakly: the transport must not keep the session manager alive.
    pub fn set_unauthorized_observer(&self, observer: Weak<dyn UnauthorizedObserver>) {
        *self
            .observer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(observer);
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.client.request(method, &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = self.current_credential() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::network("request timed out")
            } else {
                ClientError::network(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::network(format!("failed to read response body: {e}")))?;

        if status.is_success() {
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_slice(&bytes)
                .map_err(|e| ClientError::network(format!("malformed response body: {e}")))
        } else {
            let error = ClientError::api(error_message(&bytes, status), status.as_u16());
            if status == StatusCode::UNAUTHORIZED {
                self.signal_unauthorized().await;
            }
            Err(error)
        }
    }

    async fn signal_unauthorized(&self) {
        let observer = self
            .observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade);
        if let Some(observer) = observer {
            observer.on_unauthorized().await;
        }
    }

    fn current_credential(&self) -> Option<String> {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        self.execute(Method::GET, path, query, None).await
    }

    async fn post(&self, path: &str, body: Option<Value>) -> Result<Value> {
        self.execute(Method::POST, path, &[], body).await
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        self.execute(Method::DELETE, path, &[], None).await
    }

    fn set_credential(&self, credential: Option<String>) {
        *self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credential;
    }
}

/// Extract the server's error message, falling back to the status line.
fn error_message(bytes: &[u8], status: StatusCode) -> String {
    serde_json::from_slice::<ErrorBody>(bytes)
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()))
}

fn normalize_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
