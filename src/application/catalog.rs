//! Card catalog: paginated listings, an id-indexed cache, and search.
//!
//! Two views are maintained: the paged "all cards" list and the caller's
//! own collection. Every fetched card also lands in the id cache, which is
//! last-write-wins by card id. Overlapping listing fetches are resolved by
//! sequence number: only the most recently issued fetch may write the list
//! and pagination state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::json;
use tokio::sync::watch;

use crate::application::notifications::NotificationQueue;
use crate::application::session::SessionManager;
use crate::domain::error::Result;
use crate::domain::models::{Card, Page};
use crate::domain::ports::{decode, Transport};

/// Owner of the card collection views and the id-indexed cache.
pub struct CardCatalog {
    transport: Arc<dyn Transport>,
    session: Arc<SessionManager>,
    notifier: Arc<NotificationQueue>,
    page_size: u32,
    state: Mutex<CatalogState>,
    changed: watch::Sender<u64>,
}

struct CatalogState {
    all: Vec<Card>,
    mine: Vec<Card>,
    cache: HashMap<String, Card>,
    page: u32,
    has_more: bool,
    issued_listing: u64,
    settled_listing: u64,
    issued_mine: u64,
    settled_mine: u64,
}

impl Default for CatalogState {
    fn default() -> Self {
        Self {
            all: Vec::new(),
            mine: Vec::new(),
            cache: HashMap::new(),
            page: 1,
            has_more: true,
            issued_listing: 0,
            settled_listing: 0,
            issued_mine: 0,
            settled_mine: 0,
        }
    }
}

impl CardCatalog {
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
            state: Mutex::new(CatalogState::default()),
            changed,
        }
    }

    /// Fetch one page of the full catalog.
    ///
    /// With `append` the page is concatenated to the loaded list, otherwise
    /// the list is replaced. Every returned card is merged into the id
    /// cache. A response superseded by a newer listing fetch leaves the
    /// list and pagination untouched.
    ///
    /// # Errors
    /// Notifies and re-raises, so callers can distinguish a failed load
    /// from an empty catalog.
    pub async fn fetch_page(&self, page: u32, append: bool) -> Result<Page<Card>> {
        let seq = {
            let mut state = self.lock();
            state.issued_listing += 1;
            state.issued_listing
        };

        let query = [
            ("page".to_string(), page.to_string()),
            ("pageSize".to_string(), self.page_size.to_string()),
        ];
        let result = self
            .transport
            .get("/cards", &query)
            .await
            .and_then(decode::<Page<Card>>);

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.settle_listing(seq);
                self.notifier
                    .error(e.surface_message("Could not load cards").to_string());
                return Err(e);
            }
        };

        {
            let mut state = self.lock();
            state.settled_listing = state.settled_listing.max(seq);
            for card in &response.items {
                state.cache.insert(card.id.clone(), card.clone());
            }
            if seq == state.issued_listing {
                if append {
                    state.all.extend(response.items.iter().cloned());
                } else {
                    state.all = response.items.clone();
                }
                state.page = response.page;
                state.has_more = response.has_more;
            } else {
                tracing::debug!(seq, "discarding superseded card page");
            }
        }
        self.touch();
        Ok(response)
    }

    /// Fetch the next page, appending.
    ///
    /// No-op while a listing fetch is in flight or once the last page was
    /// reached.
    ///
    /// # Errors
    /// Same policy as [`Self::fetch_page`].
    pub async fn load_next_page(&self) -> Result<()> {
        let next = {
            let state = self.lock();
            if !state.has_more || state.issued_listing > state.settled_listing {
                return Ok(());
            }
            state.page + 1
        };
        self.fetch_page(next, true).await?;
        Ok(())
    }

    /// Fetch the caller's own cards, replacing the "mine" view.
    ///
    /// # Errors
    /// Same policy as [`Self::fetch_page`].
    pub async fn fetch_owned(&self) -> Result<Vec<Card>> {
        let seq = {
            let mut state = self.lock();
            state.issued_mine += 1;
            state.issued_mine
        };

        let result = self
            .transport
            .get("/me/cards", &[])
            .await
            .and_then(decode::<Vec<Card>>);

        match result {
            Ok(cards) => {
                {
                    let mut state = self.lock();
                    state.settled_mine = state.settled_mine.max(seq);
                    for card in &cards {
                        state.cache.insert(card.id.clone(), card.clone());
                    }
                    if seq == state.issued_mine {
                        state.mine = cards.clone();
                    }
                }
                self.touch();
                Ok(cards)
            }
            Err(e) => {
                let mut state = self.lock();
                state.settled_mine = state.settled_mine.max(seq);
                drop(state);
                self.notifier
                    .error(e.surface_message("Could not load your cards").to_string());
                Err(e)
            }
        }
    }

    /// Add cards to the caller's collection.
    ///
    /// On success the "mine" view and the session profile are refreshed
    /// concurrently before the call resolves. Reports success as a boolean
    /// rather than raising.
    pub async fn add_to_collection(&self, card_ids: &[String]) -> bool {
        let body = json!({ "cardIds": card_ids });
        match self.transport.post("/me/cards", Some(body)).await {
            Ok(_) => {
                self.notifier.success(format!(
                    "{} card(s) added to your collection",
                    card_ids.len()
                ));
                let (owned, ()) =
                    tokio::join!(self.fetch_owned(), self.session.refresh_profile());
                if let Err(e) = owned {
                    tracing::debug!(error = %e, "collection refresh failed after add");
                }
                true
            }
            Err(e) => {
                self.notifier
                    .error(e.surface_message("Could not add cards").to_string());
                false
            }
        }
    }

    /// Cached card lookup; never fetches.
    #[must_use]
    pub fn get_cached(&self, id: &str) -> Option<Card> {
        self.lock().cache.get(id).cloned()
    }

    /// Cached-or-fetched card lookup.
    ///
    /// Best effort: a fetch failure yields `None` without notifying.
    pub async fn fetch_by_id(&self, id: &str) -> Option<Card> {
        if let Some(card) = self.get_cached(id) {
            return Some(card);
        }

        let result = self
            .transport
            .get(&format!("/cards/{id}"), &[])
            .await
            .and_then(decode::<Card>);

        match result {
            Ok(card) => {
                self.lock().cache.insert(card.id.clone(), card.clone());
                self.touch();
                Some(card)
            }
            Err(e) => {
                tracing::debug!(card = id, error = %e, "single card fetch failed");
                None
            }
        }
    }

    /// Case-insensitive substring search over the loaded "all cards" list.
    ///
    /// Results are bounded by what has already been paged in.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<Card> {
        let needle = query.to_lowercase();
        self.lock()
            .all
            .iter()
            .filter(|card| {
                card.name.to_lowercase().contains(&needle)
                    || card.description.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Drop all loaded state, restoring page 1 / `has_more`. Runs on
    /// logout. In-flight listing responses are invalidated.
    pub fn reset(&self) {
        {
            let mut state = self.lock();
            state.all.clear();
            state.mine.clear();
            state.cache.clear();
            state.page = 1;
            state.has_more = true;
            state.issued_listing += 1;
            state.settled_listing = state.issued_listing;
            state.issued_mine += 1;
            state.settled_mine = state.issued_mine;
        }
        self.touch();
    }

    /// Snapshot of the loaded "all cards" list.
    #[must_use]
    pub fn cards(&self) -> Vec<Card> {
        self.lock().all.clone()
    }

    /// Snapshot of the caller's own cards.
    #[must_use]
    pub fn my_cards(&self) -> Vec<Card> {
        self.lock().mine.clone()
    }

    #[must_use]
    pub fn card_count(&self) -> usize {
        self.lock().all.len()
    }

    #[must_use]
    pub fn my_card_count(&self) -> usize {
        self.lock().mine.len()
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

    fn settle_listing(&self, seq: u64) {
        let mut state = self.lock();
        state.settled_listing = state.settled_listing.max(seq);
    }

    fn touch(&self) {
        self.changed.send_modify(|rev| *rev += 1);
    }

    fn lock(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
