//! Forum API boundary
//!
//! This module defines what the crawl engine needs from a forum:
//! - Listing posts created within a time window
//! - Fetching a single post with a closed set of outcomes
//! - Fetching a post's comment forest, newest first
//! - Expanding "more comments" placeholders
//!
//! `RedditClient` talks to the real OAuth JSON API; `FixtureForum` serves an
//! in-memory forum for tests and is only built with the `test-support`
//! feature.

mod auth;
#[cfg(any(test, feature = "test-support"))]
mod fixture;
mod reddit;

pub use auth::{AccessToken, TokenCache};
#[cfg(any(test, feature = "test-support"))]
pub use fixture::FixtureForum;
pub use reddit::RedditClient;

use crate::Timestamp;
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by forum API calls
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Unexpected response from {url}: {message}")]
    UnexpectedShape { url: String, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Unavailable(String),
}

impl ApiError {
    /// Returns the HTTP status code, if this error carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Inclusive time window `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeWindow {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    /// Both bounds are inclusive
    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// A top-level submission as delivered by the forum
#[derive(Debug, Clone, PartialEq)]
pub struct ForumPost {
    pub id: String,
    pub forum: String,
    pub title: String,
    pub created_at: Timestamp,
}

/// A comment or reply with its (possibly partial) reply forest
#[derive(Debug, Clone, PartialEq)]
pub struct ForumComment {
    pub id: String,
    /// Id of the comment this replies to; `None` for top-level comments
    pub parent_id: Option<String>,
    /// Absent for deleted accounts
    pub author: Option<String>,
    pub body: String,
    pub created_at: Timestamp,
    pub replies: Vec<CommentNode>,
}

/// Placeholder for comments that were not included in a response
#[derive(Debug, Clone, PartialEq)]
pub struct MoreComments {
    pub id: String,
    /// Fullname of the node this placeholder hangs under (`t1_..` or `t3_..`)
    pub parent_id: String,
    /// Ids of the hidden comments; empty for "continue this thread" links
    pub children: Vec<String>,
    pub count: u32,
}

/// A node in a comment forest
#[derive(Debug, Clone, PartialEq)]
pub enum CommentNode {
    Comment(ForumComment),
    More(MoreComments),
}

/// Outcome of fetching a single post by id
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(ForumPost),
    NotFound,
    Forbidden,
    Failed(String),
}

/// Operations the crawl engine needs from a forum
#[async_trait]
pub trait ForumApi: Send + Sync {
    /// Lists posts in `forum` created within `window` (both bounds inclusive)
    async fn list_posts(&self, forum: &str, window: TimeWindow) -> Result<Vec<ForumPost>, ApiError>;

    /// Fetches a post by id
    async fn fetch_post(&self, post_id: &str) -> FetchOutcome;

    /// Fetches the comment forest of a post, top-level comments newest first
    async fn comment_forest(&self, post: &ForumPost) -> Result<Vec<CommentNode>, ApiError>;

    /// Expands a placeholder into the nodes it stands for
    ///
    /// The returned nodes replace the placeholder in its parent's reply list and
    /// may themselves contain further placeholders.
    async fn expand_more(
        &self,
        post: &ForumPost,
        more: &MoreComments,
    ) -> Result<Vec<CommentNode>, ApiError>;
}
