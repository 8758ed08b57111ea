//! Domain models for the card-trading marketplace.
//!
//! Wire-facing types use `camelCase` serde renaming to match the server's
//! JSON. Cards are value types: cache entries are replaced on re-fetch,
//! never mutated in place.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's profile as returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Cards in the user's collection, when the server includes them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_cards: Option<Vec<Card>>,
}

/// A tradeable collectible card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// Side of a trade an item sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeRole {
    /// Offered by the proposer.
    Offering,
    /// Requested in return.
    Receiving,
}

/// One card within a trade proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeItem {
    pub id: String,
    pub card_id: String,
    pub trade_id: String,
    pub role: TradeRole,
    pub card: Card,
}

/// A trade proposal listed on the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeProposal {
    pub id: String,
    pub proposer_user_id: String,
    pub created_at: DateTime<Utc>,
    pub proposer_name: String,
    #[serde(default)]
    pub items: Vec<TradeItem>,
}

/// Client-side input for a new trade proposal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDraft {
    pub card_id: String,
    pub role: TradeRole,
}

/// One page of a server-side listing plus its continuation flag.
///
/// `has_more == false` is terminal for the listing sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_size: u32,
    pub page: u32,
    pub has_more: bool,
}

/// An authenticated session. The credential and profile always travel
/// together; a session with only one of them cannot be constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub credential: String,
    pub profile: UserProfile,
}

/// Authentication state of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Anonymous,
    Authenticated,
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Info,
    Warning,
}

impl Severity {
    /// Default display duration before auto-dismissal.
    #[must_use]
    pub const fn default_duration(self) -> Duration {
        match self {
            Self::Error => Duration::from_millis(8000),
            _ => Duration::from_millis(5000),
        }
    }
}

/// A transient user-facing message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub severity: Severity,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Server response to a successful login.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub credential: String,
    pub profile: UserProfile,
}

/// Server response to a successful registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: String,
}

/// Server response to a created trade proposal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTradeResponse {
    pub trade_id: String,
}
