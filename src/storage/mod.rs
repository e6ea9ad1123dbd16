//! Storage module for persisting harvested items
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - Field-length validation before anything is written
//! - Idempotent upserts of posts and comments keyed by their external id
//! - Queries used by the refresh task, the read API and statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteRepository;
pub use traits::{ItemRepository, StorageError, StorageResult, ValidationError};

use crate::Timestamp;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// Maximum length of a post or comment id, in characters
pub const MAX_ID_LEN: usize = 10;

/// Maximum length of a forum name, in characters
pub const MAX_FORUM_LEN: usize = 200;

/// Maximum length of a post title, in characters
pub const MAX_TITLE_LEN: usize = 300;

/// Maximum length of a comment body, in characters
pub const MAX_BODY_LEN: usize = 1000;

/// Opens (or creates) the item database at `path`
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteRepository)` - Database opened and schema initialized
/// * `Err(StorageError)` - Failed to open the database
pub fn open_repository(path: &Path) -> StorageResult<SqliteRepository> {
    SqliteRepository::open(path)
}

/// A stored post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: String,
    pub forum: String,
    pub title: String,
    pub created_at: Timestamp,
}

impl PostRecord {
    /// Checks every field against its storage limit
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_id("post", &self.id, "id", &self.id)?;
        check_len("post", &self.id, "forum", &self.forum, MAX_FORUM_LEN)?;
        check_len("post", &self.id, "title", &self.title, MAX_TITLE_LEN)?;
        Ok(())
    }
}

/// A stored comment or reply
///
/// Replies are stored exactly like top-level comments; only the owning post
/// is recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: String,
    pub post_id: String,
    pub forum: String,
    pub body: String,
    pub created_at: Timestamp,
}

impl CommentRecord {
    /// Checks every field against its storage limit
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_id("comment", &self.id, "id", &self.id)?;
        check_id("comment", &self.id, "post_id", &self.post_id)?;
        check_len("comment", &self.id, "forum", &self.forum, MAX_FORUM_LEN)?;
        check_len("comment", &self.id, "body", &self.body, MAX_BODY_LEN)?;
        Ok(())
    }
}

fn check_id(
    entity: &'static str,
    id: &str,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError {
            entity,
            id: id.to_string(),
            field,
            length: 0,
            limit: MAX_ID_LEN,
        });
    }
    check_len(entity, id, field, value, MAX_ID_LEN)
}

fn check_len(
    entity: &'static str,
    id: &str,
    field: &'static str,
    value: &str,
    limit: usize,
) -> Result<(), ValidationError> {
    let length = value.chars().count();
    if length > limit {
        return Err(ValidationError {
            entity,
            id: id.to_string(),
            field,
            length,
            limit,
        });
    }
    Ok(())
}

/// A post or comment returned by the read API
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoredItem {
    Post(PostRecord),
    Comment(CommentRecord),
}

impl StoredItem {
    pub fn id(&self) -> &str {
        match self {
            Self::Post(post) => &post.id,
            Self::Comment(comment) => &comment.id,
        }
    }

    pub fn created_at(&self) -> Timestamp {
        match self {
            Self::Post(post) => post.created_at,
            Self::Comment(comment) => comment.created_at,
        }
    }

    /// The text searched by keyword queries
    pub fn text(&self) -> &str {
        match self {
            Self::Post(post) => &post.title,
            Self::Comment(comment) => &comment.body,
        }
    }
}

/// Parameters of a read API query
#[derive(Debug, Clone, PartialEq)]
pub struct ItemQuery {
    pub forum: String,
    /// Inclusive lower bound on `created_at`
    pub from: Timestamp,
    /// Inclusive upper bound on `created_at`
    pub to: Timestamp,
    /// Whitespace-separated terms; an item matches if any term is one of its words
    pub keyword: Option<String>,
}

impl ItemQuery {
    /// Returns true if `text` satisfies the keyword filter
    ///
    /// Terms match whole words, ignoring case and punctuation, so `art` does
    /// not match "start".
    pub fn matches_keyword(&self, text: &str) -> bool {
        let Some(keyword) = &self.keyword else {
            return true;
        };
        let terms: HashSet<String> = words(keyword).collect();
        if terms.is_empty() {
            return true;
        }
        words(text).any(|word| terms.contains(&word))
    }
}

/// Lowercased alphanumeric runs of `text`
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

/// Number of stored items for one forum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForumCount {
    pub forum: String,
    pub posts: u64,
    pub comments: u64,
}
