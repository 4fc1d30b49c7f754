use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::api::{routes, ApiError, Method, RemoteCall};
use crate::models::{Comment, Post};
use crate::notice::Notices;

use super::{Coordinator, InteractionError, InteractionKind, Ticket};

/// Posting comments and replies.
///
/// Only the comment counter is applied optimistically; the comment itself
/// is inserted once the server returns it.
pub struct Comments;

pub type CommentSite = Coordinator<Comments>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSnapshot {
    pub parent_id: Option<i64>,
}

impl InteractionKind for Comments {
    type Target = Post;
    type Snapshot = CommentSnapshot;

    const ACTION: &'static str = "comment";

    // Each call adds exactly one to the counter, so rollbacks commute.
    const INDEPENDENT: bool = true;

    fn restore(post: &mut Post, _snapshot: CommentSnapshot) {
        post.stats.comments -= 1;
    }

    fn confirm(post: &mut Post, snapshot: CommentSnapshot, payload: Value) -> Option<String> {
        match serde_json::from_value::<Comment>(payload) {
            Ok(comment) => match snapshot.parent_id {
                Some(parent_id) => match post.find_comment_mut(parent_id) {
                    Some(parent) => parent.replies.push(comment),
                    None => debug!(post_id = post.id, parent_id, "Reply parent not loaded"),
                },
                None => post.comments.insert(0, comment),
            },
            Err(e) => warn!(post_id = post.id, error = %e, "Created comment missing from response"),
        }
        Some("Comment posted".to_string())
    }

    fn failure_message(_error: &ApiError) -> String {
        "Failed to post comment.".to_string()
    }
}

impl Coordinator<Comments> {
    /// Post `content` on `post`, as a reply to `parent_id` when given.
    pub fn add_comment(
        &mut self,
        post: &mut Post,
        content: &str,
        parent_id: Option<i64>,
        notices: &mut Notices,
    ) -> Result<Ticket, InteractionError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(InteractionError::InvalidRequest("comment is empty"));
        }
        self.authorize(notices)?;

        post.stats.comments += 1;

        let body = json!({
            "postId": post.id,
            "content": content,
            "parentCommentId": parent_id.unwrap_or(0),
        });
        let call = RemoteCall::new(Method::Post, routes::CREATE_COMMENT, Some(body));
        Ok(self.launch(post.id, CommentSnapshot { parent_id }, call))
    }
}
