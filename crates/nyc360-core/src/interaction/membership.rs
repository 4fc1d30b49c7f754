use serde_json::{json, Value};
use tracing::debug;

use crate::api::{routes, ApiError, Method, RemoteCall};
use crate::models::Community;
use crate::notice::Notices;

use super::{Coordinator, InteractionError, InteractionKind, Ticket};

/// Joining and leaving communities.
///
/// Unlike reactions, the control is disabled (`is_loading_join`) while a
/// call is in flight, so at most one membership call per community runs at
/// a time.
pub struct Membership;

pub type MembershipSite = Coordinator<Membership>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipSnapshot {
    pub is_joined: bool,
    pub member_count: i64,
}

impl InteractionKind for Membership {
    type Target = Community;
    type Snapshot = MembershipSnapshot;

    const ACTION: &'static str = "join communities";

    fn restore(community: &mut Community, snapshot: MembershipSnapshot) {
        community.is_joined = snapshot.is_joined;
        community.member_count = snapshot.member_count;
    }

    fn confirm(community: &mut Community, _snapshot: MembershipSnapshot, _payload: Value) -> Option<String> {
        Some(
            if community.is_joined {
                "You have joined the community!"
            } else {
                "You have left the community."
            }
            .to_string(),
        )
    }

    fn release(community: &mut Community) {
        community.is_loading_join = false;
    }

    fn failure_message(error: &ApiError) -> String {
        match error {
            ApiError::Rejected(message) => message.clone(),
            _ => "Membership change failed.".to_string(),
        }
    }
}

impl Coordinator<Membership> {
    /// Join `community`. `Ok(None)` when there is nothing to do.
    pub fn join(&mut self, community: &mut Community, notices: &mut Notices) -> Result<Option<Ticket>, InteractionError> {
        self.change_membership(community, true, notices)
    }

    /// Leave `community`. `Ok(None)` when there is nothing to do.
    pub fn leave(&mut self, community: &mut Community, notices: &mut Notices) -> Result<Option<Ticket>, InteractionError> {
        self.change_membership(community, false, notices)
    }

    fn change_membership(
        &mut self,
        community: &mut Community,
        join: bool,
        notices: &mut Notices,
    ) -> Result<Option<Ticket>, InteractionError> {
        self.authorize(notices)?;
        if community.is_loading_join {
            debug!(community_id = community.id, "Membership change already in flight");
            return Ok(None);
        }
        if community.is_joined == join {
            return Ok(None);
        }

        let snapshot = MembershipSnapshot {
            is_joined: community.is_joined,
            member_count: community.member_count,
        };
        community.is_loading_join = true;
        community.is_joined = join;
        community.member_count += if join { 1 } else { -1 };

        let path = if join {
            routes::join_community(community.id)
        } else {
            routes::leave_community(community.id)
        };
        let call = RemoteCall::new(Method::Post, path, Some(json!({})));
        Ok(Some(self.launch(community.id, snapshot, call)))
    }
}
