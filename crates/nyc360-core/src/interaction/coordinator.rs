use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::{ApiError, RemoteCall, RemoteCaller};
use crate::auth::SessionStore;
use crate::models::Identified;
use crate::notice::Notices;

use super::ledger::{PendingLedger, Resolution};
use super::{InteractionError, Settled, Settlement, Ticket};

/// Buffer size for the call outcome channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// What varies between interaction sites.
pub trait InteractionKind {
    type Target: Identified;
    /// State captured before the optimistic mutation.
    type Snapshot;

    /// Completes "Please login to ..." and the unauthenticated error.
    const ACTION: &'static str;

    /// Whether a failure may always restore its own snapshot, even with
    /// newer calls on the same target in flight.
    const INDEPENDENT: bool = false;

    fn restore(target: &mut Self::Target, snapshot: Self::Snapshot);

    /// Apply a successful outcome; returns the success notice, if any.
    fn confirm(target: &mut Self::Target, snapshot: Self::Snapshot, payload: Value) -> Option<String> {
        let _ = (target, snapshot, payload);
        None
    }

    /// Runs once the target has no calls left in flight.
    fn release(target: &mut Self::Target) {
        let _ = target;
    }

    fn failure_message(error: &ApiError) -> String;
}

/// Outcome of one dispatched call, sent back from its task.
struct Completion {
    ticket: Ticket,
    result: Result<Value, ApiError>,
}

/// One interaction site: optimistic apply, dispatch, then settle.
pub struct Coordinator<K: InteractionKind> {
    session: Arc<SessionStore>,
    caller: Arc<dyn RemoteCaller>,
    ledger: PendingLedger<K::Snapshot>,
    results_tx: mpsc::Sender<Completion>,
    results_rx: mpsc::Receiver<Completion>,
}

impl<K: InteractionKind> Coordinator<K> {
    pub fn new(session: Arc<SessionStore>, caller: Arc<dyn RemoteCaller>) -> Self {
        let (results_tx, results_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        Self {
            session,
            caller,
            ledger: PendingLedger::default(),
            results_tx,
            results_rx,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Number of calls still in flight.
    pub fn in_flight(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_pending(&self, target_id: i64) -> bool {
        self.ledger.has_pending(target_id)
    }

    /// Reject anonymous users: post a notice and send them to sign in.
    pub(crate) fn authorize(&self, notices: &mut Notices) -> Result<(), InteractionError> {
        if self.session.is_logged_in() {
            return Ok(());
        }
        debug!(action = K::ACTION, "Rejected anonymous interaction");
        notices.info(format!("Please login to {}", K::ACTION));
        self.session.redirect_to_sign_in();
        Err(InteractionError::Unauthenticated(K::ACTION))
    }

    /// Record the snapshot and dispatch the call.
    ///
    /// Callers apply their optimistic mutation before calling this, so the
    /// new state is in place before the request exists.
    pub(crate) fn launch(&mut self, target_id: i64, snapshot: K::Snapshot, call: RemoteCall) -> Ticket {
        let ticket = self.ledger.record(target_id, snapshot);
        let caller = Arc::clone(&self.caller);
        let tx = self.results_tx.clone();

        debug!(
            action = K::ACTION,
            target_id = target_id,
            generation = ticket.generation,
            path = %call.path,
            "Dispatching interaction"
        );
        tokio::spawn(async move {
            let result = caller.request(call.method, &call.path, call.body).await;
            if tx.send(Completion { ticket, result }).await.is_err() {
                debug!(target_id = ticket.target_id, "Interaction site closed before call settled");
            }
        });
        ticket
    }

    /// Apply every outcome that has already arrived, without waiting.
    pub fn settle_ready(&mut self, targets: &mut [K::Target], notices: &mut Notices) -> Vec<Settled> {
        let mut settled = Vec::new();
        while let Ok(completion) = self.results_rx.try_recv() {
            settled.push(self.apply(completion, targets, notices));
        }
        settled
    }

    /// Wait for the next outcome and apply it. `None` when nothing is in flight.
    pub async fn settle_next(&mut self, targets: &mut [K::Target], notices: &mut Notices) -> Option<Settled> {
        if self.ledger.len() == 0 {
            return None;
        }
        let completion = self.results_rx.recv().await?;
        Some(self.apply(completion, targets, notices))
    }

    fn apply(&mut self, completion: Completion, targets: &mut [K::Target], notices: &mut Notices) -> Settled {
        let Completion { ticket, result } = completion;
        let resolution = self.ledger.resolve(ticket, result.is_ok(), K::INDEPENDENT);

        let Some(target) = targets.iter_mut().find(|t| t.id() == ticket.target_id) else {
            debug!(target_id = ticket.target_id, "Interaction settled for a target no longer on screen");
            return Settled {
                ticket,
                settlement: Settlement::Detached,
            };
        };
        if !self.ledger.has_pending(ticket.target_id) {
            K::release(target);
        }

        let settlement = match (result, resolution) {
            (Ok(payload), Resolution::Confirmed(snapshot)) => {
                if let Some(message) = K::confirm(target, snapshot, payload) {
                    notices.success(message);
                }
                Settlement::Confirmed
            }
            (Err(error), Resolution::Restore(snapshot)) => {
                warn!(action = K::ACTION, target_id = ticket.target_id, error = %error, "Interaction failed, rolling back");
                K::restore(target, snapshot);
                notices.error(K::failure_message(&error));
                Settlement::RolledBack
            }
            (Err(error), Resolution::Superseded) => {
                warn!(action = K::ACTION, target_id = ticket.target_id, error = %error, "Interaction failed after a newer change");
                notices.error(K::failure_message(&error));
                Settlement::Superseded
            }
            _ => {
                debug!(target_id = ticket.target_id, "Ignoring outcome of an unknown call");
                Settlement::Detached
            }
        };

        Settled { ticket, settlement }
    }
}
