//! Application layer - the stores and their coordination rules.
//!
//! Each store owns its state exclusively; cross-store effects (cache
//! resets, profile refreshes, notifications) go through the references
//! injected at construction.

pub mod catalog;
pub mod notifications;
pub mod session;
pub mod trades;

#[cfg(test)]
pub mod support;

pub use catalog::CardCatalog;
pub use notifications::NotificationQueue;
pub use session::SessionManager;
pub use trades::TradeLedger;
