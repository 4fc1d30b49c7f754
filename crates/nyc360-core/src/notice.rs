//! Transient user-visible notices ("toasts").
//!
//! Interaction sites post a notice when a call settles or an action is
//! rejected; the front end renders `active()` and calls `prune()` on its
//! tick to drop expired ones.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// How long a notice stays visible.
pub const NOTICE_LIFETIME_MS: i64 = 3500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: u64,
    pub message: String,
    pub kind: NoticeKind,
    pub created_at: DateTime<Utc>,
}

impl Notice {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= Duration::milliseconds(NOTICE_LIFETIME_MS)
    }
}

#[derive(Debug, Default)]
pub struct Notices {
    next_id: u64,
    items: Vec<Notice>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: NoticeKind, message: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push(Notice {
            id,
            message: message.into(),
            kind,
            created_at: Utc::now(),
        });
        id
    }

    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        self.push(NoticeKind::Success, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.push(NoticeKind::Error, message)
    }

    pub fn info(&mut self, message: impl Into<String>) -> u64 {
        self.push(NoticeKind::Info, message)
    }

    pub fn dismiss(&mut self, id: u64) {
        self.items.retain(|notice| notice.id != id);
    }

    /// Drop expired notices, returning how many were removed.
    pub fn prune(&mut self) -> usize {
        self.prune_at(Utc::now())
    }

    pub fn prune_at(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.items.len();
        self.items.retain(|notice| !notice.is_expired_at(now));
        before - self.items.len()
    }

    pub fn active(&self) -> &[Notice] {
        &self.items
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.items.last()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
