//! Storage traits and error types
//!
//! This module defines the trait interface for item repositories and
//! associated error types.

use crate::storage::{CommentRecord, ForumCount, ItemQuery, PostRecord, StoredItem};
use crate::Timestamp;
use thiserror::Error;

/// A field exceeded its storage limit (or an id was empty)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{entity} {id:?}: field {field} has length {length}, limit is {limit}")]
pub struct ValidationError {
    pub entity: &'static str,
    pub id: String,
    pub field: &'static str,
    pub length: usize,
    pub limit: usize,
}

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for item repository implementations
///
/// Upserts are keyed by the item's external id: writing the same id twice
/// leaves exactly one record holding the latest values. Implementations must
/// be safe to share between concurrently running sync tasks.
pub trait ItemRepository: Send + Sync {
    // ===== Writes =====

    /// Inserts or replaces a post
    ///
    /// # Returns
    ///
    /// * `Err(StorageError::Validation)` - A field exceeds its limit; nothing was written
    fn upsert_post(&self, post: &PostRecord) -> StorageResult<()>;

    /// Inserts or replaces a comment
    ///
    /// # Returns
    ///
    /// * `Err(StorageError::Validation)` - A field exceeds its limit; nothing was written
    fn upsert_comment(&self, comment: &CommentRecord) -> StorageResult<()>;

    // ===== Crawl Queries =====

    /// Gets every stored post
    fn list_posts(&self) -> StorageResult<Vec<PostRecord>>;

    /// Gets the newest stored comment timestamp of a post, if it has any
    fn max_comment_timestamp(&self, post_id: &str) -> StorageResult<Option<Timestamp>>;

    /// Gets a post by id
    fn get_post(&self, id: &str) -> StorageResult<Option<PostRecord>>;

    /// Gets a comment by id
    fn get_comment(&self, id: &str) -> StorageResult<Option<CommentRecord>>;

    // ===== Read Queries =====

    /// Gets posts and comments of one forum within a time range
    ///
    /// Results are merged and sorted by `created_at`, newest first.
    fn query_items(&self, query: &ItemQuery) -> StorageResult<Vec<StoredItem>>;

    /// Gets post and comment counts per forum, ordered by forum name
    fn forum_counts(&self) -> StorageResult<Vec<ForumCount>>;
}
