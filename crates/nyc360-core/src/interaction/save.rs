use serde_json::Value;

use crate::api::{routes, ApiError, Method, RemoteCall};
use crate::models::Post;
use crate::notice::Notices;

use super::{Coordinator, InteractionError, InteractionKind, Ticket};

/// Bookmarking a post.
pub struct Saves;

pub type SaveSite = Coordinator<Saves>;

impl InteractionKind for Saves {
    type Target = Post;
    /// `is_saved` before the toggle
    type Snapshot = bool;

    const ACTION: &'static str = "save posts";

    fn restore(post: &mut Post, was_saved: bool) {
        post.is_saved = was_saved;
    }

    fn confirm(_post: &mut Post, was_saved: bool, _payload: Value) -> Option<String> {
        Some(if was_saved { "Post unsaved" } else { "Post saved successfully!" }.to_string())
    }

    fn failure_message(_error: &ApiError) -> String {
        "Failed to save post".to_string()
    }
}

impl Coordinator<Saves> {
    /// Flip the saved flag now and tell the server.
    pub fn toggle_save(&mut self, post: &mut Post, notices: &mut Notices) -> Result<Ticket, InteractionError> {
        self.authorize(notices)?;

        let was_saved = post.is_saved;
        post.is_saved = !was_saved;

        let call = RemoteCall::new(Method::Post, routes::save_post(post.id), None);
        Ok(self.launch(post.id, was_saved, call))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::Settlement;
    use crate::notice::NoticeKind;
    use crate::testing::{anonymous_session, signed_in_session, Reply, ScriptedCaller};

    #[tokio::test]
    async fn test_save_confirmed() {
        let caller = ScriptedCaller::new(vec![Reply::Ok(Value::Null)]);
        let mut site = SaveSite::new(signed_in_session(), caller.clone());
        let mut notices = Notices::new();
        let mut posts = vec![Post::new(3)];

        site.toggle_save(&mut posts[0], &mut notices).expect("toggle");
        assert!(posts[0].is_saved);

        let settled = site.settle_next(&mut posts, &mut notices).await.expect("settles");
        assert_eq!(settled.settlement, Settlement::Confirmed);
        assert!(posts[0].is_saved);

        let latest = notices.latest().expect("notice");
        assert_eq!(latest.kind, NoticeKind::Success);
        assert_eq!(latest.message, "Post saved successfully!");

        let calls = caller.calls();
        assert_eq!(calls[0].method, Method::Post);
        assert_eq!(calls[0].path, "/posts/3/save");
    }

    #[tokio::test]
    async fn test_unsave_confirmed() {
        let caller = ScriptedCaller::new(vec![]);
        let mut site = SaveSite::new(signed_in_session(), caller);
        let mut notices = Notices::new();
        let mut posts = vec![Post { is_saved: true, ..Post::new(3) }];

        site.toggle_save(&mut posts[0], &mut notices).expect("toggle");
        assert!(!posts[0].is_saved);
        site.settle_next(&mut posts, &mut notices).await.expect("settles");
        assert_eq!(notices.latest().map(|n| n.message.as_str()), Some("Post unsaved"));
    }

    #[tokio::test]
    async fn test_save_failure_restores_flag() {
        let caller = ScriptedCaller::new(vec![Reply::Fail("down".into())]);
        let mut site = SaveSite::new(signed_in_session(), caller);
        let mut notices = Notices::new();
        let mut posts = vec![Post::new(3)];

        site.toggle_save(&mut posts[0], &mut notices).expect("toggle");
        let settled = site.settle_next(&mut posts, &mut notices).await.expect("settles");
        assert_eq!(settled.settlement, Settlement::RolledBack);
        assert!(!posts[0].is_saved);

        let latest = notices.latest().expect("notice");
        assert_eq!(latest.kind, NoticeKind::Error);
        assert_eq!(latest.message, "Failed to save post");
    }

    #[tokio::test]
    async fn test_anonymous_save_redirects() {
        let (session, navigator) = anonymous_session();
        let caller = ScriptedCaller::new(vec![]);
        let mut site = SaveSite::new(session, caller.clone());
        let mut notices = Notices::new();
        let mut post = Post::new(3);

        assert_eq!(
            site.toggle_save(&mut post, &mut notices),
            Err(InteractionError::Unauthenticated("save posts"))
        );
        assert!(!post.is_saved);
        assert_eq!(notices.latest().map(|n| n.message.as_str()), Some("Please login to save posts"));
        assert_eq!(navigator.visited().len(), 1);
        assert_eq!(site.in_flight(), 0);
        assert!(caller.calls().is_empty());
    }
}
