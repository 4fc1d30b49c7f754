//! Core library for the NYC360 client.
//!
//! This crate holds the parts of the client with real invariants:
//!
//! - `auth`: the session store that turns a persisted bearer token into an
//!   observable [`auth::Identity`] and answers role/permission checks
//! - `interaction`: per-screen optimistic update sites (reactions, saves,
//!   membership, comments) that apply locally, call the server and roll
//!   back on failure
//! - `store`: key-value persistence backends for the stored credential
//! - `api`: the remote caller seam and its reqwest implementation
//! - `notice`: transient user-visible notices
//!
//! Everything runs on one logical thread of control. Remote calls are the
//! only suspension points; their outcomes come back over a channel and are
//! applied by whoever owns the screen state.

pub mod api;
pub mod auth;
pub mod config;
pub mod interaction;
pub mod models;
pub mod notice;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ApiError, Method, RemoteCaller};
pub use auth::{AuthError, Identity, Navigator, SessionStore, SUPER_ROLE};
pub use config::Config;
pub use interaction::{
    CommentSite, InteractionError, MembershipSite, ReactionSite, SaveSite, Settled, Settlement,
    Ticket,
};
pub use models::{Comment, Community, InteractionTarget, Post, Reaction, Stats};
pub use notice::{Notice, NoticeKind, Notices};
pub use store::KeyValueStore;
