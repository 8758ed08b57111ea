//! Domain layer - core types, errors, and ports.
//!
//! This layer contains pure models and the trait boundaries of the state
//! layer, without any I/O.

pub mod error;
pub mod models;
pub mod ports;

pub use error::{ClientError, Result};
pub use models::{
    Card, CreateTradeResponse, LoginResponse, Notification, Page, RegisterResponse, Session,
    SessionPhase, Severity, TradeDraft, TradeItem, TradeProposal, TradeRole, UserProfile,
};
pub use ports::{decode, Navigator, NoopNavigator, SessionStore, Transport, UnauthorizedObserver};
