//! Infrastructure layer - adapters for the domain ports.
//!
//! This layer handles all I/O: HTTP, SQLite, and configuration files.

pub mod config;
pub mod http;
pub mod session_store;

pub use config::{ApiConfig, ClientConfig, PagingConfig, StorageConfig};
pub use http::HttpTransport;
pub use session_store::SqliteSessionStore;
