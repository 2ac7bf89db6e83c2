use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// The candidate's input was rejected locally; nothing was sent.
    Validation,
    /// A call to the assessment service failed.
    Error,
}

/// A candidate-facing message that dismisses itself after `ttl`.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub raised_at_utc: DateTime<Utc>,
    raised_at: Instant,
    ttl: Duration,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>, ttl: Duration) -> Self {
        Self {
            kind,
            message: message.into(),
            raised_at_utc: Utc::now(),
            raised_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) < self.ttl
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.ttl
            .saturating_sub(now.saturating_duration_since(self.raised_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_notice_expires_after_ttl() {
        let notice = Notice::new(NoticeKind::Validation, "Nope", Duration::from_secs(5));
        assert!(notice.is_visible(Instant::now()));

        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert!(notice.is_visible(Instant::now()));
        assert_eq!(notice.remaining(Instant::now()), Duration::from_millis(1));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!notice.is_visible(Instant::now()));
        assert_eq!(notice.remaining(Instant::now()), Duration::ZERO);
    }
}
