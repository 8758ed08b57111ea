//! Test doubles and fixtures shared by the store tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::domain::error::{ClientError, Result};
use crate::domain::models::{Session, UserProfile};
use crate::domain::ports::{Navigator, SessionStore, Transport, UnauthorizedObserver};

/// One scripted response; the optional gate defers delivery until released.
struct Scripted {
    result: Result<Value>,
    gate: Option<oneshot::Receiver<()>>,
}

/// Scriptable [`Transport`] double.
///
/// Responses are keyed by `"METHOD path"` and consumed in FIFO order. An
/// unauthorized scripted error triggers the registered observer exactly
/// like the real transport. Unscripted requests fail with a network error.
pub struct MockTransport {
    responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<String>>,
    credential: Mutex<Option<String>>,
    observer: Mutex<Option<Weak<dyn UnauthorizedObserver>>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            credential: Mutex::new(None),
            observer: Mutex::new(None),
        })
    }

    /// Queue a response for `METHOD path`.
    pub fn script(&self, method: &str, path: &str, result: Result<Value>) {
        lock(&self.responses)
            .entry(format!("{method} {path}"))
            .or_default()
            .push_back(Scripted { result, gate: None });
    }

    /// Queue a response that is withheld until the returned sender fires.
    pub fn script_gated(
        &self,
        method: &str,
        path: &str,
        result: Result<Value>,
    ) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        lock(&self.responses)
            .entry(format!("{method} {path}"))
            .or_default()
            .push_back(Scripted {
                result,
                gate: Some(rx),
            });
        tx
    }

    /// Register the observer signalled on scripted 401 errors.
    pub fn set_observer(&self, observer: Weak<dyn UnauthorizedObserver>) {
        *lock(&self.observer) = Some(observer);
    }

    /// Total number of requests issued.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of requests whose `"METHOD path"` record matches exactly.
    pub fn calls_matching(&self, call: &str) -> usize {
        lock(&self.calls).iter().filter(|c| *c == call).count()
    }

    /// The credential most recently installed via `set_credential`.
    pub fn credential(&self) -> Option<String> {
        lock(&self.credential).clone()
    }

    async fn respond(&self, method: &str, path: &str) -> Result<Value> {
        lock(&self.calls).push(format!("{method} {path}"));

        let scripted = lock(&self.responses)
            .get_mut(&format!("{method} {path}"))
            .and_then(VecDeque::pop_front);

        let Some(mut scripted) = scripted else {
            return Err(ClientError::network(format!(
                "unscripted request: {method} {path}"
            )));
        };

        if let Some(gate) = scripted.gate.take() {
            let _released = gate.await;
        }

        if let Err(e) = &scripted.result {
            if e.is_unauthorized() {
                let observer = lock(&self.observer).as_ref().and_then(Weak::upgrade);
                if let Some(observer) = observer {
                    observer.on_unauthorized().await;
                }
            }
        }
        scripted.result
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str, _query: &[(String, String)]) -> Result<Value> {
        self.respond("GET", path).await
    }

    async fn post(&self, path: &str, _body: Option<Value>) -> Result<Value> {
        self.respond("POST", path).await
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        self.respond("DELETE", path).await
    }

    fn set_credential(&self, credential: Option<String>) {
        *lock(&self.credential) = credential;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory [`SessionStore`] double.
#[derive(Default)]
pub struct MemorySessionStore {
    record: Mutex<Option<Session>>,
}

impl SessionStore for MemorySessionStore {
    fn save(&self, credential: &str, profile: &UserProfile) -> Result<()> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(Session {
            credential: credential.to_string(),
            profile: profile.clone(),
        });
        Ok(())
    }

    fn load(&self) -> Result<Option<Session>> {
        Ok(self
            .record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn clear(&self) -> Result<()> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// [`Navigator`] double that counts redirects.
#[derive(Default)]
pub struct RecordingNavigator {
    pub redirects: std::sync::atomic::AtomicUsize,
}

impl Navigator for RecordingNavigator {
    fn to_login(&self) {
        self.redirects
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

pub fn sample_profile(id: &str, name: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        owned_cards: None,
    }
}

pub fn profile_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase()),
    })
}

pub fn login_response_json(credential: &str, name: &str) -> Value {
    json!({
        "credential": credential,
        "profile": profile_json("u1", name),
    })
}

pub fn card_json(id: &str, name: &str) -> Value {
    card_json_with(id, name, "A collectible card")
}

pub fn card_json_with(id: &str, name: &str, description: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": description,
        "imageUrl": format!("https://cards.example/{id}.png"),
        "createdAt": "2024-03-01T12:00:00Z",
    })
}

pub fn cards_page_json(cards: &[(&str, &str)], page: u32, has_more: bool) -> Value {
    let items: Vec<Value> = cards.iter().map(|(id, name)| card_json(id, name)).collect();
    json!({
        "items": items,
        "pageSize": 20,
        "page": page,
        "hasMore": has_more,
    })
}

pub fn trade_json(id: &str, proposer: &str) -> Value {
    json!({
        "id": id,
        "proposerUserId": proposer,
        "createdAt": "2024-03-02T09:30:00Z",
        "proposerName": "Trader",
        "items": [{
            "id": format!("{id}-i1"),
            "cardId": "c1",
            "tradeId": id,
            "role": "OFFERING",
            "card": card_json("c1", "Golem"),
        }],
    })
}

pub fn trades_page_json(trades: &[(&str, &str)], page: u32, has_more: bool) -> Value {
    let items: Vec<Value> = trades
        .iter()
        .map(|(id, proposer)| trade_json(id, proposer))
        .collect();
    json!({
        "items": items,
        "pageSize": 10,
        "page": page,
        "hasMore": has_more,
    })
}
