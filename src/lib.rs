//! Client-side state layer for a collectible-card trading marketplace.
//!
//! Owns the authenticated session, the paginated card catalog and its
//! id-indexed cache, the trade-proposal ledger, and the ephemeral
//! notification queue, plus the coupling rules between them: cache
//! invalidation after mutation, profile refresh after collection changes,
//! and global session teardown on authorization failure.
//!
//! The stores are plain `Send + Sync` values wired together by [`Client`].
//! Network access, durable storage, and redirects sit behind the ports in
//! [`domain::ports`], with default adapters (`reqwest`, SQLite) in the
//! infrastructure layer.

pub mod application;
pub mod client;
pub mod domain;
pub mod infrastructure;

pub use application::{CardCatalog, NotificationQueue, SessionManager, TradeLedger};
pub use client::Client;
pub use domain::error::{ClientError, Result};
pub use domain::models::{
    Card, CreateTradeResponse, LoginResponse, Notification, Page, RegisterResponse, Session,
    SessionPhase, Severity, TradeDraft, TradeItem, TradeProposal, TradeRole, UserProfile,
};
pub use domain::ports::{Navigator, NoopNavigator, SessionStore, Transport, UnauthorizedObserver};
pub use infrastructure::{
    ApiConfig, ClientConfig, HttpTransport, PagingConfig, SqliteSessionStore, StorageConfig,
};
