//! Session lifecycle: login, registration, restore, and teardown.
//!
//! The manager is the single writer of the durable session record. The
//! transport signals authorization failures here and never touches the
//! record itself.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::watch;

use crate::application::notifications::NotificationQueue;
use crate::domain::models::{
    LoginResponse, RegisterResponse, Session, SessionPhase, UserProfile,
};
use crate::domain::ports::{decode, Navigator, SessionStore, Transport, UnauthorizedObserver};

/// Owner of the authentication session (credential + profile).
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    store: Arc<dyn SessionStore>,
    notifier: Arc<NotificationQueue>,
    navigator: Arc<dyn Navigator>,
    session: Mutex<Option<Session>>,
    phase: watch::Sender<SessionPhase>,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn SessionStore>,
        notifier: Arc<NotificationQueue>,
        navigator: Arc<dyn Navigator>,
    ) -> Arc<Self> {
        let (phase, _) = watch::channel(SessionPhase::Anonymous);
        Arc::new(Self {
            transport,
            store,
            notifier,
            navigator,
            session: Mutex::new(None),
            phase,
        })
    }

    /// Restore a previously persisted session.
    ///
    /// Enters `Authenticated` optimistically when a complete record exists,
    /// then revalidates the profile on a background task; a 401 during
    /// revalidation tears the session down again. Never blocks on the
    /// network. Returns the optimistic authenticated flag.
    pub fn restore(self: &Arc<Self>) -> bool {
        let record = match self.store.load() {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted session");
                if let Err(e) = self.store.clear() {
                    tracing::warn!(error = %e, "failed to clear unreadable session record");
                }
                None
            }
        };
        let Some(session) = record else {
            return false;
        };

        self.transport.set_credential(Some(session.credential.clone()));
        *self.lock() = Some(session);
        self.publish_phase();
        tracing::info!("session restored, revalidating profile");

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.refresh_profile().await;
        });
        true
    }

    /// Authenticate with the marketplace.
    ///
    /// Emits a notification either way and reports success as a boolean
    /// rather than raising.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        let body = json!({ "email": email, "password": password });
        let result = self
            .transport
            .post("/login", Some(body))
            .await
            .and_then(decode::<LoginResponse>);

        match result {
            Ok(LoginResponse {
                credential,
                profile,
            }) => {
                self.transport.set_credential(Some(credential.clone()));
                self.persist(&credential, &profile);
                self.notifier.success(format!("Welcome, {}!", profile.name));
                tracing::info!(user = %profile.id, "logged in");
                *self.lock() = Some(Session {
                    credential,
                    profile,
                });
                self.publish_phase();
                true
            }
            Err(e) => {
                self.notifier
                    .error(e.surface_message("Invalid email or password").to_string());
                false
            }
        }
    }

    /// Create an account. Does not authenticate automatically.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> bool {
        let body = json!({ "name": name, "email": email, "password": password });
        let result = self
            .transport
            .post("/register", Some(body))
            .await
            .and_then(decode::<RegisterResponse>);

        match result {
            Ok(response) => {
                tracing::info!(user_id = %response.user_id, "account registered");
                self.notifier
                    .success("Account created. Log in to continue.");
                true
            }
            Err(e) => {
                self.notifier
                    .error(e.surface_message("Could not create your account").to_string());
                false
            }
        }
    }

    /// Re-fetch the profile for the current session.
    ///
    /// Runs as a background side-effect of other operations: failures are
    /// silent apart from the 401 teardown, and the profile simply stays
    /// stale.
    pub async fn refresh_profile(&self) {
        if !self.is_authenticated() {
            return;
        }

        match self.transport.get("/me", &[]).await.and_then(decode::<UserProfile>) {
            Ok(profile) => {
                let credential = {
                    let mut guard = self.lock();
                    match guard.as_mut() {
                        Some(session) => {
                            session.profile = profile.clone();
                            Some(session.credential.clone())
                        }
                        // Logged out while the refresh was in flight.
                        None => None,
                    }
                };
                if let Some(credential) = credential {
                    self.persist(&credential, &profile);
                    self.publish_phase();
                }
            }
            Err(e) if e.is_unauthorized() => {
                tracing::info!("credential rejected during profile refresh");
                self.logout();
            }
            Err(e) => {
                tracing::debug!(error = %e, "profile refresh failed, keeping stale profile");
            }
        }
    }

    /// Clear the session in memory and in durable storage. Idempotent.
    pub fn logout(&self) {
        self.transport.set_credential(None);
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear persisted session");
        }
        let had_session = self.lock().take().is_some();
        if had_session {
            tracing::info!("logged out");
            self.publish_phase();
        }
    }

    /// Whether a session is currently held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock().is_some()
    }

    /// Snapshot of the current profile.
    #[must_use]
    pub fn profile(&self) -> Option<UserProfile> {
        self.lock().as_ref().map(|s| s.profile.clone())
    }

    /// Id of the signed-in user.
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.lock().as_ref().map(|s| s.profile.id.clone())
    }

    /// Phase changes: `Anonymous` / `Authenticated`, published on every
    /// transition and on profile refresh.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.phase.subscribe()
    }

    fn publish_phase(&self) {
        let phase = if self.is_authenticated() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        };
        self.phase.send_replace(phase);
    }

    fn persist(&self, credential: &str, profile: &UserProfile) {
        if let Err(e) = self.store.save(credential, profile) {
            tracing::warn!(error = %e, "failed to persist session");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UnauthorizedObserver for SessionManager {
    async fn on_unauthorized(&self) {
        tracing::info!("authorization failure, tearing down session");
        self.logout();
        self.navigator.to_login();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::application::support::{
        login_response_json, profile_json, sample_profile, MemorySessionStore, MockTransport,
        RecordingNavigator,
    };
    use crate::domain::error::ClientError;
    use crate::domain::models::Severity;

    struct Harness {
        transport: Arc<MockTransport>,
        store: Arc<MemorySessionStore>,
        notifier: Arc<NotificationQueue>,
        navigator: Arc<RecordingNavigator>,
        manager: Arc<SessionManager>,
    }

    fn harness() -> Harness {
        let transport = MockTransport::new();
        let store = Arc::new(MemorySessionStore::default());
        let notifier = NotificationQueue::new();
        let navigator = Arc::new(RecordingNavigator::default());
        let manager = SessionManager::new(
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&store) as Arc<dyn SessionStore>,
            Arc::clone(&notifier),
            Arc::clone(&navigator) as Arc<dyn Navigator>,
        );
        Harness {
            transport,
            store,
            notifier,
            navigator,
            manager,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_success_persists_and_notifies() {
        let h = harness();
        h.transport
            .script("POST", "/login", Ok(login_response_json("tok-1", "Ada")));

        assert!(h.manager.login("a@x.com", "pw").await);
        assert!(h.manager.is_authenticated());
        assert_eq!(h.transport.credential(), Some("tok-1".to_string()));

        let saved = h.store.load().expect("load").expect("record saved");
        assert_eq!(saved.credential, "tok-1");
        assert_eq!(saved.profile.name, "Ada");

        let notes = h.notifier.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].severity, Severity::Success);
        assert!(notes[0].message.contains("Ada"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_failure_surfaces_server_message() {
        let h = harness();
        h.transport.script(
            "POST",
            "/login",
            Err(ClientError::api("Account locked", 403)),
        );

        assert!(!h.manager.login("a@x.com", "pw").await);
        assert!(!h.manager.is_authenticated());
        assert!(h.store.load().expect("load").is_none());

        let notes = h.notifier.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "Account locked");
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_network_failure_uses_fallback_message() {
        let h = harness();
        h.transport
            .script("POST", "/login", Err(ClientError::network("refused")));

        assert!(!h.manager.login("a@x.com", "pw").await);
        assert_eq!(
            h.notifier.notifications()[0].message,
            "Invalid email or password"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_does_not_authenticate() {
        let h = harness();
        h.transport
            .script("POST", "/register", Ok(serde_json::json!({"userId": "u9"})));

        assert!(h.manager.register("Ada", "a@x.com", "pw").await);
        assert!(!h.manager.is_authenticated());
        assert_eq!(h.notifier.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_is_optimistic_then_revalidates() {
        let h = harness();
        h.store
            .save("tok-1", &sample_profile("u1", "Ada"))
            .expect("seed store");
        h.transport
            .script("GET", "/me", Ok(profile_json("u1", "Ada Lovelace")));

        assert!(h.manager.restore());
        assert!(h.manager.is_authenticated());

        // Let the revalidation task run.
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(
            h.manager.profile().expect("profile").name,
            "Ada Lovelace"
        );
        assert!(h.notifier.is_empty(), "background refresh never notifies");
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_revalidation_401_tears_down() {
        let h = harness();
        h.store
            .save("tok-stale", &sample_profile("u1", "Ada"))
            .expect("seed store");
        h.transport
            .script("GET", "/me", Err(ClientError::api("expired", 401)));

        assert!(h.manager.restore());

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(!h.manager.is_authenticated());
        assert!(h.store.load().expect("load").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_without_record_stays_anonymous() {
        let h = harness();
        assert!(!h.manager.restore());
        assert!(!h.manager.is_authenticated());
        assert_eq!(h.transport.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_failure_keeps_stale_profile_silently() {
        let h = harness();
        h.transport
            .script("POST", "/login", Ok(login_response_json("tok-1", "Ada")));
        assert!(h.manager.login("a@x.com", "pw").await);
        h.notifier.clear_all();

        h.transport
            .script("GET", "/me", Err(ClientError::network("flaky")));
        h.manager.refresh_profile().await;

        assert!(h.manager.is_authenticated());
        assert_eq!(h.manager.profile().expect("profile").name, "Ada");
        assert!(h.notifier.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_is_idempotent() {
        let h = harness();
        h.transport
            .script("POST", "/login", Ok(login_response_json("tok-1", "Ada")));
        assert!(h.manager.login("a@x.com", "pw").await);

        h.manager.logout();
        h.manager.logout();

        assert!(!h.manager.is_authenticated());
        assert!(h.store.load().expect("load").is_none());
        assert_eq!(h.transport.credential(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_signal_clears_session_and_redirects() {
        let h = harness();
        h.transport
            .script("POST", "/login", Ok(login_response_json("tok-1", "Ada")));
        assert!(h.manager.login("a@x.com", "pw").await);

        h.manager.on_unauthorized().await;

        assert!(!h.manager.is_authenticated());
        assert!(h.store.load().expect("load").is_none());
        assert_eq!(h.navigator.redirects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_phase_subscription_tracks_transitions() {
        let h = harness();
        let mut rx = h.manager.subscribe();
        assert_eq!(*rx.borrow_and_update(), SessionPhase::Anonymous);

        h.transport
            .script("POST", "/login", Ok(login_response_json("tok-1", "Ada")));
        assert!(h.manager.login("a@x.com", "pw").await);
        rx.changed().await.expect("manager alive");
        assert_eq!(*rx.borrow_and_update(), SessionPhase::Authenticated);

        h.manager.logout();
        rx.changed().await.expect("manager alive");
        assert_eq!(*rx.borrow_and_update(), SessionPhase::Anonymous);
    }
}
