//! Transient user notices.
//!
//! The session pushes [`Notice`]s into an outbox; the TUI keeps them on a
//! [`NoticeBoard`] that drops each one after its time-to-live, and the one-shot mode
//! prints them to stderr.

use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        write!(f, "[{tag}] {}", self.message)
    }
}

/// Auto-dismissing stack of notices, newest last.
pub struct NoticeBoard {
    ttl: Duration,
    max_visible: usize,
    entries: VecDeque<(Instant, Notice)>,
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            max_visible: 4,
            entries: VecDeque::new(),
        }
    }

    pub fn push(&mut self, notice: Notice) {
        self.push_at(notice, Instant::now());
    }

    pub fn push_at(&mut self, notice: Notice, now: Instant) {
        self.entries.push_back((now, notice));
        while self.entries.len() > self.max_visible {
            self.entries.pop_front();
        }
    }

    /// Drop every notice older than the time-to-live.
    pub fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|(raised, _)| now.saturating_duration_since(*raised) < ttl);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn visible(&self) -> impl Iterator<Item = &Notice> {
        self.entries.iter().map(|(_, n)| n)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_expire_after_ttl() {
        let mut board = NoticeBoard::new(Duration::from_secs(4));
        let t0 = Instant::now();
        board.push_at(Notice::error("first"), t0);
        board.push_at(Notice::info("second"), t0 + Duration::from_secs(3));

        board.prune(t0 + Duration::from_secs(5));
        let left: Vec<_> = board.visible().map(|n| n.message.as_str()).collect();
        assert_eq!(left, vec!["second"]);

        board.prune(t0 + Duration::from_secs(8));
        assert!(board.is_empty());
    }

    #[test]
    fn board_keeps_only_most_recent() {
        let mut board = NoticeBoard::new(Duration::from_secs(60));
        for i in 0..6 {
            board.push(Notice::info(format!("n{i}")));
        }
        let left: Vec<_> = board.visible().map(|n| n.message.clone()).collect();
        assert_eq!(left, vec!["n2", "n3", "n4", "n5"]);
    }

    #[test]
    fn display_prefixes_level() {
        assert_eq!(Notice::warning("careful").to_string(), "[warning] careful");
    }
}
