//! Ports to the outside world: network transport, durable session storage,
//! and navigation. Concrete adapters live in the infrastructure layer.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{ClientError, Result};
use super::models::{Session, UserProfile};

/// HTTP transport consumed by every store.
///
/// Implementations inject the current credential into outgoing requests.
/// A 401 response must reach the registered [`UnauthorizedObserver`] before
/// the error is returned to the requesting caller; the transport itself
/// never touches session state or storage.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a GET request, returning the raw JSON body.
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value>;

    /// Perform a POST request with an optional JSON body.
    async fn post(&self, path: &str, body: Option<Value>) -> Result<Value>;

    /// Perform a DELETE request.
    async fn delete(&self, path: &str) -> Result<Value>;

    /// Replace the credential attached to subsequent requests.
    fn set_credential(&self, credential: Option<String>);
}

/// Durable storage for the persisted session record.
///
/// The credential and profile are written and cleared together; a partial
/// record must never become visible to `load`.
pub trait SessionStore: Send + Sync {
    /// Persist both halves of the session atomically.
    ///
    /// # Errors
    /// Returns an error if the record cannot be written.
    fn save(&self, credential: &str, profile: &UserProfile) -> Result<()>;

    /// Read the persisted session, if a complete one exists.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    fn load(&self) -> Result<Option<Session>>;

    /// Erase both halves of the session atomically. Idempotent.
    ///
    /// # Errors
    /// Returns an error if the record cannot be cleared.
    fn clear(&self) -> Result<()>;
}

/// Redirect capability invoked after an authorization failure.
pub trait Navigator: Send + Sync {
    fn to_login(&self);
}

/// A [`Navigator`] that goes nowhere, for headless embedders.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn to_login(&self) {}
}

/// Receiver of the transport's authorization-failure signal.
#[async_trait]
pub trait UnauthorizedObserver: Send + Sync {
    /// Called before a 401 error is returned to the requesting caller.
    async fn on_unauthorized(&self);
}

/// Decode a raw JSON value into a typed response.
///
/// Decoding failures are transport-class errors: the server answered, but
/// not with the agreed shape.
///
/// # Errors
/// Returns a network error when the value does not match `T`.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ClientError::network(format!("unexpected response shape: {e}")))
}
