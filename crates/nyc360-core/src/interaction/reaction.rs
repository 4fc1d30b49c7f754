use std::marker::PhantomData;

use serde_json::json;
use tracing::debug;

use crate::api::{routes, ApiError, Method, RemoteCall};
use crate::models::{InteractionTarget, Post, Reaction, Stats};
use crate::notice::Notices;

use super::{Coordinator, InteractionError, InteractionKind, Ticket};

/// Like/dislike toggling on any [`InteractionTarget`].
pub struct Reactions<T>(PhantomData<fn() -> T>);

pub type ReactionSite<T = Post> = Coordinator<Reactions<T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionSnapshot {
    pub reaction: Reaction,
    pub stats: Stats,
}

/// Apply the toggle rules to `stats` and return the new reaction.
///
/// Requesting the current reaction deselects it. Otherwise the previous
/// reaction's counter (if any) goes down and the requested one goes up.
pub fn apply_reaction(current: Reaction, stats: &mut Stats, requested: Reaction) -> Reaction {
    if requested == current {
        if let Some(counter) = stats.counter_mut(current) {
            *counter -= 1;
        }
        return Reaction::None;
    }
    if let Some(counter) = stats.counter_mut(current) {
        *counter -= 1;
    }
    if let Some(counter) = stats.counter_mut(requested) {
        *counter += 1;
    }
    requested
}

impl<T: InteractionTarget> InteractionKind for Reactions<T> {
    type Target = T;
    type Snapshot = ReactionSnapshot;

    const ACTION: &'static str = "interact";

    fn restore(target: &mut T, snapshot: ReactionSnapshot) {
        target.set_reaction(snapshot.reaction);
        *target.stats_mut() = snapshot.stats;
    }

    fn failure_message(error: &ApiError) -> String {
        if error.is_unreachable() {
            "Network error: server unreachable.".to_string()
        } else {
            "Failed to interact. Try again.".to_string()
        }
    }
}

impl<T: InteractionTarget> Coordinator<Reactions<T>> {
    /// Toggle `requested` on `target`: apply locally now, confirm remotely later.
    ///
    /// No `isLoading` guard here: a second toggle may be issued while the
    /// first is in flight.
    pub fn toggle(
        &mut self,
        target: &mut T,
        requested: Reaction,
        notices: &mut Notices,
    ) -> Result<Ticket, InteractionError> {
        self.authorize(notices)?;
        if requested == Reaction::None {
            return Err(InteractionError::InvalidRequest("a reaction must be like or dislike"));
        }

        let snapshot = ReactionSnapshot {
            reaction: target.reaction(),
            stats: *target.stats(),
        };
        let next = apply_reaction(snapshot.reaction, target.stats_mut(), requested);
        target.set_reaction(next);
        debug!(
            target_id = target.id(),
            from = snapshot.reaction.label(),
            to = next.label(),
            "Applied reaction optimistically"
        );

        let call = RemoteCall::new(
            Method::Put,
            routes::interact(target.id()),
            Some(json!({ "type": requested.code() })),
        );
        Ok(self.launch(target.id(), snapshot, call))
    }
}

// ============================================================================
// Tests
// ============================================================================
