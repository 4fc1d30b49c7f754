//! Optimistic interactions with rollback.
//!
//! Every togglable action on a screen (like/dislike, save, join/leave,
//! comment) follows the same protocol:
//!
//! 1. reject immediately if nobody is signed in (no mutation, no call)
//! 2. snapshot the fields the action touches
//! 3. apply the new local state synchronously, so it is visible before the
//!    request exists
//! 4. dispatch the remote call on a spawned task
//! 5. on success keep the optimistic state; on failure restore the snapshot
//!    and post an error notice
//!
//! A `Coordinator` is one interaction site. It is not shared between
//! screens. Call outcomes come back over a channel and are applied by the
//! owner of the screen state through `settle_ready` (non-blocking) or
//! `settle_next` (await one).
//!
//! Late failures: if an older call on a target fails after a newer toggle
//! was applied, the live state is left alone and the older snapshot is
//! handed to the next newer in-flight call on that target. That call's own
//! rollback then lands on the last state the server accepted.

pub mod comment;
pub mod coordinator;
mod ledger;
pub mod membership;
pub mod reaction;
pub mod save;

use thiserror::Error;

pub use comment::{CommentSite, Comments};
pub use coordinator::{Coordinator, InteractionKind};
pub use membership::{Membership, MembershipSite};
pub use reaction::{apply_reaction, ReactionSite, Reactions};
pub use save::{SaveSite, Saves};

/// Handle for one dispatched call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub target_id: i64,
    pub generation: u64,
}

/// What settling a call did to the screen state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Call succeeded; the optimistic state stands.
    Confirmed,
    /// Call failed; the target was restored to its snapshot.
    RolledBack,
    /// Call failed after a newer toggle; the live state was left alone.
    Superseded,
    /// The target is no longer on screen.
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settled {
    pub ticket: Ticket,
    pub settlement: Settlement,
}

/// Actions rejected before any mutation or network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InteractionError {
    #[error("Sign in required to {0}")]
    Unauthenticated(&'static str),

    #[error("Invalid interaction: {0}")]
    InvalidRequest(&'static str),
}
