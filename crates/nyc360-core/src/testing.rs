//! Test helpers: token builders, a recording navigator and a scripted caller.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::api::{ApiError, Method, RemoteCall, RemoteCaller};
use crate::auth::{Navigator, SessionStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::store::{KeyValueStore, MemoryStore};

// ============================================================================
// Tokens
// ============================================================================

/// A three-segment token with an unsigned header and the given payload.
pub fn unsigned_token(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.sig")
}

/// A token valid for the next hour unless `claims` sets its own `exp`.
pub fn token_for(mut claims: Value) -> String {
    if let Some(map) = claims.as_object_mut() {
        map.entry("exp")
            .or_insert_with(|| json!(Utc::now().timestamp() + 3600));
    }
    unsigned_token(&claims)
}

/// A token that expired a minute ago.
pub fn expired_token(mut claims: Value) -> String {
    if let Some(map) = claims.as_object_mut() {
        map.insert("exp".to_string(), json!(Utc::now().timestamp() - 60));
    }
    unsigned_token(&claims)
}

// ============================================================================
// Navigation
// ============================================================================

#[derive(Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl Navigator for RecordingNavigator {
    fn go_to(&self, path: &str) {
        if let Ok(mut visited) = self.visited.lock() {
            visited.push(path.to_string());
        }
    }
}

// ============================================================================
// Sessions
// ============================================================================

pub fn signed_in_session() -> Arc<SessionStore> {
    let store = Arc::new(MemoryStore::default());
    let token = token_for(json!({"sub": "1", "unique_name": "tester"}));
    store.set(ACCESS_TOKEN_KEY, &token).expect("seed token");
    store.set(REFRESH_TOKEN_KEY, "refresh").expect("seed refresh");
    Arc::new(SessionStore::new(
        Some(store as Arc<dyn KeyValueStore>),
        Arc::new(RecordingNavigator::default()),
    ))
}

pub fn anonymous_session() -> (Arc<SessionStore>, Arc<RecordingNavigator>) {
    let navigator = Arc::new(RecordingNavigator::default());
    let session = SessionStore::new(
        Some(Arc::new(MemoryStore::default()) as Arc<dyn KeyValueStore>),
        navigator.clone() as Arc<dyn Navigator>,
    );
    (Arc::new(session), navigator)
}

// ============================================================================
// Remote calls
// ============================================================================

/// Scripted outcome for the next call.
pub enum Reply {
    Ok(Value),
    /// Fails with a server error carrying this message.
    Fail(String),
    /// Waits until the matching [`Gate`] is opened.
    Gated(oneshot::Receiver<Result<Value, String>>),
}

/// Releases one gated call.
pub struct Gate {
    tx: oneshot::Sender<Result<Value, String>>,
}

impl Gate {
    pub fn succeed(self) {
        let _ = self.tx.send(Ok(Value::Null));
    }

    pub fn succeed_with(self, payload: Value) {
        let _ = self.tx.send(Ok(payload));
    }

    pub fn fail(self, message: &str) {
        let _ = self.tx.send(Err(message.to_string()));
    }
}

/// A `RemoteCaller` that records every call and answers from a script.
/// Unscripted calls succeed with `Value::Null`.
#[derive(Default)]
pub struct ScriptedCaller {
    calls: Mutex<Vec<RemoteCall>>,
    replies: Mutex<VecDeque<Reply>>,
}

impl ScriptedCaller {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(replies.into()),
        })
    }

    /// Queue a gated reply and return the handle that releases it.
    pub fn gate(&self) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(Reply::Gated(rx));
        Gate { tx }
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Yield until at least `n` calls have been dispatched.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.calls().len() < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl RemoteCaller for ScriptedCaller {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let reply = {
            self.calls
                .lock()
                .expect("calls lock")
                .push(RemoteCall::new(method, path, body));
            self.replies.lock().expect("replies lock").pop_front()
        };

        match reply {
            None => Ok(Value::Null),
            Some(Reply::Ok(value)) => Ok(value),
            Some(Reply::Fail(message)) => Err(ApiError::ServerError(message)),
            Some(Reply::Gated(rx)) => match rx.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(message)) => Err(ApiError::ServerError(message)),
                Err(_) => Err(ApiError::ServerError("gate dropped".to_string())),
            },
        }
    }
}
