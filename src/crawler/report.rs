//! Per-cycle reporting

use crate::crawler::persist::SaveTally;
use crate::forum::TimeWindow;
use crate::storage::ValidationError;
use crate::Timestamp;

/// How a forum's sync ended
#[derive(Debug, Clone, PartialEq)]
pub enum ForumStatus {
    /// Every listed post was handled; the watermark may advance
    Completed,
    /// The post listing could not be fetched
    Unavailable(String),
    /// A post failed validation; the forum's watermark must not advance
    Fatal(ValidationError),
}

/// Outcome of one forum sync
#[derive(Debug, Clone, PartialEq)]
pub struct ForumReport {
    pub forum: String,
    pub window: TimeWindow,
    pub status: ForumStatus,
    pub posts_seen: usize,
    pub posts_saved: usize,
    pub posts_skipped: usize,
    pub comments: SaveTally,
    pub walk_failures: usize,
}

impl ForumReport {
    pub fn new(forum: &str, window: TimeWindow) -> Self {
        Self {
            forum: forum.to_string(),
            window,
            status: ForumStatus::Completed,
            posts_seen: 0,
            posts_saved: 0,
            posts_skipped: 0,
            comments: SaveTally::default(),
            walk_failures: 0,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self.status, ForumStatus::Fatal(_))
    }
}

/// Outcome of the refresh pass over known posts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub visited: usize,
    pub refreshed: usize,
    pub not_found: usize,
    pub forbidden: usize,
    pub failed: usize,
    pub comments: SaveTally,
}

/// Outcome of one full cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub started_at: Timestamp,
    pub refresh: RefreshReport,
    /// One entry per configured forum, in configuration order
    pub forums: Vec<ForumReport>,
}

impl CycleReport {
    /// Names of forums whose sync hit a fatal error
    pub fn fatal_forums(&self) -> Vec<String> {
        self.forums
            .iter()
            .filter(|report| report.is_fatal())
            .map(|report| report.forum.clone())
            .collect()
    }

    pub fn forum(&self, name: &str) -> Option<&ForumReport> {
        self.forums.iter().find(|report| report.forum == name)
    }

    /// Logs a one-line summary plus one line per forum
    pub fn log_summary(&self) {
        let posts: usize = self.forums.iter().map(|r| r.posts_saved).sum();
        let comments: usize = self.forums.iter().map(|r| r.comments.saved).sum();
        tracing::info!(
            started_at = self.started_at,
            posts_saved = posts,
            comments_saved = comments + self.refresh.comments.saved,
            refreshed = self.refresh.refreshed,
            not_found = self.refresh.not_found,
            forbidden = self.refresh.forbidden,
            "Cycle finished"
        );
        for report in &self.forums {
            match &report.status {
                ForumStatus::Completed => tracing::info!(
                    forum = %report.forum,
                    posts_seen = report.posts_seen,
                    posts_saved = report.posts_saved,
                    comments_saved = report.comments.saved,
                    comments_skipped = report.comments.skipped,
                    walk_failures = report.walk_failures,
                    "Forum synced"
                ),
                ForumStatus::Unavailable(reason) => {
                    tracing::warn!(forum = %report.forum, "Forum unavailable: {}", reason)
                }
                ForumStatus::Fatal(e) => {
                    tracing::error!(forum = %report.forum, "Forum sync aborted: {}", e)
                }
            }
        }
    }
}
