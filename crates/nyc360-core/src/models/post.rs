use serde::{Deserialize, Serialize};

use super::{Identified, InteractionTarget};

/// The current user's reaction to a post.
///
/// Wire codes: `0`/`null` = none, `1` = like, `2` = dislike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<u8>", into = "u8")]
pub enum Reaction {
    #[default]
    None,
    Like,
    Dislike,
}

impl Reaction {
    pub fn code(self) -> u8 {
        match self {
            Reaction::None => 0,
            Reaction::Like => 1,
            Reaction::Dislike => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Reaction::None => "none",
            Reaction::Like => "like",
            Reaction::Dislike => "dislike",
        }
    }
}

impl From<Option<u8>> for Reaction {
    fn from(code: Option<u8>) -> Self {
        match code {
            Some(1) => Reaction::Like,
            Some(2) => Reaction::Dislike,
            _ => Reaction::None,
        }
    }
}

impl From<Reaction> for u8 {
    fn from(reaction: Reaction) -> Self {
        reaction.code()
    }
}

/// Post counters. Signed so a stale server count can never underflow locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub views: i64,
    pub likes: i64,
    pub dislikes: i64,
    pub comments: i64,
    pub shares: i64,
}

impl Stats {
    /// Counter that tracks `reaction`, if any.
    pub fn counter_mut(&mut self, reaction: Reaction) -> Option<&mut i64> {
        match reaction {
            Reaction::None => None,
            Reaction::Like => Some(&mut self.likes),
            Reaction::Dislike => Some(&mut self.dislikes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub replies: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default, alias = "userInteraction")]
    pub current_user_interaction: Reaction,
    #[serde(default, alias = "isSavedByUser")]
    pub is_saved: bool,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn find_comment_mut(&mut self, comment_id: i64) -> Option<&mut Comment> {
        fn walk(comments: &mut [Comment], id: i64) -> Option<&mut Comment> {
            for comment in comments {
                if comment.id == id {
                    return Some(comment);
                }
                if let Some(found) = walk(&mut comment.replies, id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&mut self.comments, comment_id)
    }
}

impl Identified for Post {
    fn id(&self) -> i64 {
        self.id
    }
}

impl InteractionTarget for Post {
    fn stats(&self) -> &Stats {
        &self.stats
    }

    fn stats_mut(&mut self) -> &mut Stats {
        &mut self.stats
    }

    fn reaction(&self) -> Reaction {
        self.current_user_interaction
    }

    fn set_reaction(&mut self, reaction: Reaction) {
        self.current_user_interaction = reaction;
    }
}
