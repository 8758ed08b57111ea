//! Trade-proposal ledger: paginated listing and mutations.
//!
//! Mutations follow two different consistency rules: a created proposal's
//! position among the existing pages is unknown, so creation reloads page 1
//! wholesale; a deletion's position is known, so the entry is dropped from
//! the loaded list in place.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::json;
use tokio::sync::watch;

use crate::application::notifications::NotificationQueue;
use crate::application::session::SessionManager;
use crate::domain::error::Result;
use crate::domain::models::{CreateTradeResponse, Page, TradeDraft, TradeProposal};
use crate::domain::ports::{decode, Transport};

/// Owner of the trade-proposal list.
pub struct TradeLedger {
    transport: Arc<dyn Transport>,
    session: Arc<SessionManager>,
    notifier: Arc<NotificationQueue>,
    page_size: u32,
    state: Mutex<LedgerState>,
    changed: watch::Sender<u64>,
}

struct LedgerState {
    trades: Vec<TradeProposal>,
    page: u32,
    has_more: bool,
    issued: u64,
    settled: u64,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            trades: Vec::new(),
            page: 1,
            has_more: true,
            issued: 0,
            settled: 0,
        }
    }
}

impl TradeLedger {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        session: Arc<SessionManager>,
        notifier: Arc<NotificationQueue>,
        page_size: u32,
    ) -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            transport,
            session,
            notifier,
            page_size,
            state: Mutex::new(LedgerState::default()),
            changed,
        }
    }

    /// Fetch one page of the trade list, replacing or appending.
    ///
    /// A response superseded by a newer fetch leaves the list and
    /// pagination untouched.
    ///
    /// # Errors
    /// Notifies and re-raises, so callers can distinguish a failed load
    /// from an empty list.
    pub async fn fetch_page(&self, page: u32, append: bool) -> Result<Page<TradeProposal>> {
        let seq = {
            let mut state = self.lock();
            state.issued += 1;
            state.issued
        };

        let query = [
            ("page".to_string(), page.to_string()),
            ("pageSize".to_string(), self.page_size.to_string()),
        ];
        let result = self
            .transport
            .get("/trades", &query)
            .await
            .and_then(decode::<Page<TradeProposal>>);

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let mut state = self.lock();
                state.settled = state.settled.max(seq);
                drop(state);
                self.notifier
                    .error(e.surface_message("Could not load trade proposals").to_string());
                return Err(e);
            }
        };

        {
            let mut state = self.lock();
            state.settled = state.settled.max(seq);
            if seq == state.issued {
                if append {
                    state.trades.extend(response.items.iter().cloned());
                } else {
                    state.trades = response.items.clone();
                }
                state.page = response.page;
                state.has_more = response.has_more;
            } else {
                tracing::debug!(seq, "discarding superseded trade page");
            }
        }
        self.touch();
        Ok(response)
    }

    /// Fetch the next page, appending.
    ///
    /// No-op while a fetch is in flight or once the last page was reached.
    ///
    /// # Errors
    /// Same policy as [`Self::fetch_page`].
    pub async fn load_next_page(&self) -> Result<()> {
        let next = {
            let state = self.lock();
            if !state.has_more || state.issued > state.settled {
                return Ok(());
            }
            state.page + 1
        };
        self.fetch_page(next, true).await?;
        Ok(())
    }

    /// Proposals made by the signed-in user.
    ///
    /// Recomputed on every read over the loaded list; empty when
    /// unauthenticated.
    #[must_use]
    pub fn my_trades(&self) -> Vec<TradeProposal> {
        let Some(user_id) = self.session.user_id() else {
            return Vec::new();
        };
        self.lock()
            .trades
            .iter()
            .filter(|t| t.proposer_user_id == user_id)
            .cloned()
            .collect()
    }

    /// Submit a new trade proposal.
    ///
    /// On success page 1 is reloaded in full (a new proposal's rank among
    /// existing pages is unknown) and the created id is returned. Failure
    /// notifies and yields `None`.
    pub async fn create_trade(&self, items: &[TradeDraft]) -> Option<String> {
        let body = json!({ "items": items });
        let result = self
            .transport
            .post("/trades", Some(body))
            .await
            .and_then(decode::<CreateTradeResponse>);

        match result {
            Ok(response) => {
                tracing::info!(trade = %response.trade_id, "trade proposal created");
                self.notifier.success("Trade proposal created");
                if let Err(e) = self.fetch_page(1, false).await {
                    tracing::debug!(error = %e, "trade list reload failed after create");
                }
                Some(response.trade_id)
            }
            Err(e) => {
                self.notifier.error(
                    e.surface_message("Could not create the trade proposal")
                        .to_string(),
                );
                None
            }
        }
    }

    /// Delete a proposal and drop it from the loaded list in place.
    pub async fn delete_trade(&self, id: &str) -> bool {
        match self.transport.delete(&format!("/trades/{id}")).await {
            Ok(_) => {
                {
                    let mut state = self.lock();
                    state.trades.retain(|t| t.id != id);
                }
                self.touch();
                self.notifier.success("Trade proposal removed");
                true
            }
            Err(e) => {
                self.notifier.error(
                    e.surface_message("Could not remove the trade proposal")
                        .to_string(),
                );
                false
            }
        }
    }

    /// Lookup in the loaded list; `None` when the proposal is not loaded.
    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<TradeProposal> {
        self.lock().trades.iter().find(|t| t.id == id).cloned()
    }

    /// Drop all loaded state, restoring page 1 / `has_more`. Runs on
    /// logout. In-flight responses are invalidated.
    pub fn reset(&self) {
        {
            let mut state = self.lock();
            state.trades.clear();
            state.page = 1;
            state.has_more = true;
            state.issued += 1;
            state.settled = state.issued;
        }
        self.touch();
    }

    /// Snapshot of the loaded trade list.
    #[must_use]
    pub fn trades(&self) -> Vec<TradeProposal> {
        self.lock().trades.clone()
    }

    #[must_use]
    pub fn trade_count(&self) -> usize {
        self.lock().trades.len()
    }

    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.lock().page
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.lock().has_more
    }

    /// Change notifications: the receiver wakes on every mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }

    fn touch(&self) {
        self.changed.send_modify(|rev| *rev += 1);
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
