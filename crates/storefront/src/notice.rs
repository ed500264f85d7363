//! Transient shopper-facing notices.
//!
//! A mutation opens one slot with a progress notice and later replaces that
//! same slot with its outcome, so repeated actions never stack notices.
//! Settled notices are dismissed after a linger period, and at most
//! [`MAX_SETTLED`] of them are kept at once. Every notice is also logged and
//! recorded as a Sentry breadcrumb.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::watch;
use uuid::Uuid;

/// Settled notices kept on the board; older ones are evicted first.
pub const MAX_SETTLED: usize = 5;

const DEFAULT_LINGER: Duration = Duration::from_secs(4);

use crate::error::add_breadcrumb;

/// Identifies one notice slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoticeId(Uuid);

impl fmt::Display for NoticeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Loading,
    Success,
    /// Partly done; softer than an error.
    Warning,
    Error,
}

impl NoticeLevel {
    const fn is_settled(self) -> bool {
        !matches!(self, Self::Loading)
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: NoticeId,
    pub level: NoticeLevel,
    pub message: String,
}

/// Observable list of live notices, oldest first.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    tx: Arc<watch::Sender<Vec<Notice>>>,
    linger: Duration,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl NoticeBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::with_linger(DEFAULT_LINGER)
    }

    /// A board whose settled notices go away after `linger`.
    #[must_use]
    pub fn with_linger(linger: Duration) -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self {
            tx: Arc::new(tx),
            linger,
        }
    }

    /// Open a slot with a progress notice.
    pub fn loading(&self, message: impl Into<String>) -> NoticeId {
        let id = NoticeId(Uuid::new_v4());
        self.put(id, NoticeLevel::Loading, message.into());
        id
    }

    pub fn success(&self, id: NoticeId, message: impl Into<String>) {
        self.put(id, NoticeLevel::Success, message.into());
    }

    pub fn warning(&self, id: NoticeId, message: impl Into<String>) {
        self.put(id, NoticeLevel::Warning, message.into());
    }

    pub fn error(&self, id: NoticeId, message: impl Into<String>) {
        self.put(id, NoticeLevel::Error, message.into());
    }

    /// Show an error in a fresh slot.
    pub fn error_now(&self, message: impl Into<String>) -> NoticeId {
        let id = NoticeId(Uuid::new_v4());
        self.error(id, message);
        id
    }

    pub fn dismiss(&self, id: NoticeId) {
        self.tx.send_if_modified(|notices| {
            let before = notices.len();
            notices.retain(|notice| notice.id != id);
            notices.len() != before
        });
    }

    #[must_use]
    pub fn get(&self, id: NoticeId) -> Option<Notice> {
        self.tx.borrow().iter().find(|notice| notice.id == id).cloned()
    }

    #[must_use]
    pub fn current(&self) -> Vec<Notice> {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Notice>> {
        self.tx.subscribe()
    }

    /// Replace the slot in place, or append it if it was dismissed.
    fn put(&self, id: NoticeId, level: NoticeLevel, message: String) {
        match level {
            NoticeLevel::Loading | NoticeLevel::Success => {
                tracing::info!(notice_id = %id, ?level, %message, "notice");
            }
            NoticeLevel::Warning | NoticeLevel::Error => {
                tracing::warn!(notice_id = %id, ?level, %message, "notice");
            }
        }
        let notice_id = id.to_string();
        add_breadcrumb(
            "notice",
            &message,
            Some(&[("notice_id", notice_id.as_str()), ("level", level.as_str())]),
        );

        self.tx.send_modify(|notices| {
            if let Some(slot) = notices.iter_mut().find(|notice| notice.id == id) {
                slot.level = level;
                slot.message = message;
            } else {
                notices.push(Notice { id, level, message });
            }
            evict_settled(notices);
        });

        if level.is_settled() {
            self.dismiss_later(id);
        }
    }

    /// Drop the slot after the linger period unless it went back to loading.
    ///
    /// Outside a Tokio runtime only the [`MAX_SETTLED`] cap applies.
    fn dismiss_later(&self, id: NoticeId) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let board = Arc::downgrade(&self.tx);
        let linger = self.linger;
        runtime.spawn(async move {
            tokio::time::sleep(linger).await;
            dismiss_settled(&board, id);
        });
    }
}

fn dismiss_settled(board: &Weak<watch::Sender<Vec<Notice>>>, id: NoticeId) {
    let Some(tx) = board.upgrade() else {
        return;
    };
    tx.send_if_modified(|notices| {
        let before = notices.len();
        notices.retain(|notice| notice.id != id || !notice.level.is_settled());
        notices.len() != before
    });
}

/// Keep the newest [`MAX_SETTLED`] settled notices; loading slots stay.
fn evict_settled(notices: &mut Vec<Notice>) {
    let settled = notices.iter().filter(|n| n.level.is_settled()).count();
    let mut excess = settled.saturating_sub(MAX_SETTLED);
    notices.retain(|notice| {
        if excess > 0 && notice.level.is_settled() {
            excess -= 1;
            false
        } else {
            true
        }
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_replaces_progress_in_place() {
        let board = NoticeBoard::new();
        let first = board.loading("Adding to cart");
        let second = board.loading("Updating wishlist");

        board.success(first, "Added to cart");

        let notices = board.current();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].id, first);
        assert_eq!(notices[0].level, NoticeLevel::Success);
        assert_eq!(notices[0].message, "Added to cart");
        assert_eq!(notices[1].id, second);
        assert_eq!(notices[1].level, NoticeLevel::Loading);
    }

    #[test]
    fn test_dismiss_then_settle_reopens_slot() {
        let board = NoticeBoard::new();
        let id = board.loading("Removing item");
        board.dismiss(id);
        assert!(board.current().is_empty());

        board.error(id, "Could not remove item");
        assert_eq!(board.get(id).map(|n| n.level), Some(NoticeLevel::Error));
    }

    #[test]
    fn test_error_now_opens_its_own_slot() {
        let board = NoticeBoard::new();
        let a = board.error_now("Sign in to continue");
        let b = board.error_now("Sign in to continue");
        assert_ne!(a, b);
        assert_eq!(board.current().len(), 2);
    }

    #[test]
    fn test_settled_notices_are_capped() {
        let board = NoticeBoard::new();
        let pending = board.loading("Clearing cart");
        for n in 0..200 {
            let id = board.loading(format!("Adding {n}"));
            board.success(id, format!("Added {n}"));
        }

        let notices = board.current();
        assert_eq!(notices.len(), MAX_SETTLED + 1);
        // The open slot survives; the newest outcomes are the ones kept.
        assert_eq!(notices[0].id, pending);
        assert_eq!(notices.last().unwrap().message, "Added 199");
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_notices_expire() {
        let board = NoticeBoard::with_linger(Duration::from_secs(2));
        let mut toasts = board.subscribe();
        let done = board.loading("Adding to cart");
        let pending = board.loading("Updating wishlist");
        board.success(done, "Added to cart");
        assert!(toasts.has_changed().unwrap());
        assert_eq!(toasts.borrow_and_update().len(), 2);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(board.get(done).is_some());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(board.get(done).is_none());
        assert!(toasts.has_changed().unwrap());
        // Still loading, so never expires on its own.
        assert_eq!(
            board.current(),
            vec![Notice {
                id: pending,
                level: NoticeLevel::Loading,
                message: "Updating wishlist".to_string(),
            }]
        );
    }
}
