//! Domain-level error types for the marketplace client.
//!
//! All errors are typed with `thiserror` and follow the transport's uniform
//! error shape: a user-facing message plus an optional HTTP status code.

use thiserror::Error;

/// Errors produced by the client stores and their adapters.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("{message}")]
    Api { message: String, status: u16 },

    /// The request never produced a usable server response (connection
    /// failure, timeout, malformed body).
    #[error("network error: {message}")]
    Network { message: String },

    /// The durable session store failed.
    #[error("storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    /// Configuration or environment error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ClientError {
    /// Create an API error from a server-supplied message and status.
    pub fn api(message: impl Into<String>, status: u16) -> Self {
        Self::Api {
            message: message.into(),
            status,
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a storage error from a rusqlite error.
    pub fn storage(err: rusqlite::Error) -> Self {
        Self::Storage {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// HTTP status code, when the server produced one.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is an authorization failure (401).
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }

    /// Message to surface to the user.
    ///
    /// Server-supplied messages are shown verbatim; everything else falls
    /// back to the operation's generic message.
    #[must_use]
    pub fn surface_message<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self {
            Self::Api { message, .. } if !message.is_empty() => message,
            _ => fallback,
        }
    }
}

/// Result type alias using `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;
