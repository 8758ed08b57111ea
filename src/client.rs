//! Client composition root.
//!
//! Wires the transport, the durable session store, and the four stores
//! together. Stores reach each other only through the references injected
//! here; there is no global state. Construction spawns a watcher task, so
//! a Tokio runtime must be running.

use std::sync::{Arc, Weak};

use crate::application::{CardCatalog, NotificationQueue, SessionManager, TradeLedger};
use crate::domain::error::Result;
use crate::domain::models::SessionPhase;
use crate::domain::ports::{
    Navigator, NoopNavigator, SessionStore, Transport, UnauthorizedObserver,
};
use crate::infrastructure::{ClientConfig, HttpTransport, PagingConfig, SqliteSessionStore};

/// Fully wired client state layer.
pub struct Client {
    pub notifications: Arc<NotificationQueue>,
    pub session: Arc<SessionManager>,
    pub catalog: Arc<CardCatalog>,
    pub trades: Arc<TradeLedger>,
}

impl Client {
    /// Build a client from configuration with the default adapters.
    ///
    /// # Errors
    /// Fails when the HTTP client cannot be built or the session database
    /// cannot be opened.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Self::with_navigator(config, Arc::new(NoopNavigator))
    }

    /// Build a client with a custom redirect target for 401 teardowns.
    ///
    /// # Errors
    /// Same conditions as [`Self::new`].
    pub fn with_navigator(config: &ClientConfig, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config.api)?);
        let store = Arc::new(SqliteSessionStore::open(&config.session_db_path())?);

        let client = Self::with_parts(
            Arc::clone(&transport) as Arc<dyn Transport>,
            store,
            navigator,
            config.paging,
        );

        let session_observer: Arc<dyn UnauthorizedObserver> = client.session.clone();
        let observer: Weak<dyn UnauthorizedObserver> = Arc::downgrade(&session_observer);
        transport.set_unauthorized_observer(observer);

        Ok(client)
    }

    /// Wire the stores over caller-provided adapters.
    ///
    /// Callers using a custom transport are responsible for routing its
    /// authorization-failure signal to [`Client::session`].
    #[must_use]
    pub fn with_parts(
        transport: Arc<dyn Transport>,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
        paging: PagingConfig,
    ) -> Self {
        let notifications = NotificationQueue::new();
        let session = SessionManager::new(
            Arc::clone(&transport),
            store,
            Arc::clone(&notifications),
            navigator,
        );
        let catalog = Arc::new(CardCatalog::new(
            Arc::clone(&transport),
            Arc::clone(&session),
            Arc::clone(&notifications),
            paging.cards_page_size,
        ));
        let trades = Arc::new(TradeLedger::new(
            transport,
            Arc::clone(&session),
            Arc::clone(&notifications),
            paging.trades_page_size,
        ));

        spawn_reset_watcher(&session, &catalog, &trades);

        Self {
            notifications,
            session,
            catalog,
            trades,
        }
    }
}

/// Reset the cached listings whenever the session drops to anonymous.
///
/// The watcher holds the stores weakly and exits once the client is gone.
fn spawn_reset_watcher(
    session: &Arc<SessionManager>,
    catalog: &Arc<CardCatalog>,
    trades: &Arc<TradeLedger>,
) {
    let mut phase = session.subscribe();
    let catalog = Arc::downgrade(catalog);
    let trades = Arc::downgrade(trades);

    tokio::spawn(async move {
        while phase.changed().await.is_ok() {
            if *phase.borrow_and_update() == SessionPhase::Anonymous {
                let (Some(catalog), Some(trades)) = (catalog.upgrade(), trades.upgrade()) else {
                    return;
                };
                tracing::debug!("session gone, resetting cached listings");
                catalog.reset();
                trades.reset();
            }
        }
    });
}
