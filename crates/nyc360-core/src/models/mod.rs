//! Data models for screen-local NYC360 entities.
//!
//! - `Post`, `Comment`, `Stats`: feed items and their counters
//! - `Reaction`: the current user's like/dislike state on a post
//! - `Community`: membership target for join/leave
//!
//! These are created when a listing loads and mutated in place by the
//! interaction sites; nothing here is persisted.

pub mod community;
pub mod post;

pub use community::Community;
pub use post::{Comment, Post, Reaction, Stats};

/// Anything an interaction site can find by id.
pub trait Identified {
    fn id(&self) -> i64;
}

/// A screen-local resource with a like/dislike state and counters.
///
/// The reaction is a single value, so a target can never hold a like and a
/// dislike from the same user at once.
pub trait InteractionTarget: Identified {
    fn stats(&self) -> &Stats;
    fn stats_mut(&mut self) -> &mut Stats;
    fn reaction(&self) -> Reaction;
    fn set_reaction(&mut self, reaction: Reaction);
}
