//! Persistence of walked items with an explicit validation policy

use crate::forum::{ForumComment, ForumPost};
use crate::storage::{CommentRecord, ItemRepository, PostRecord, StorageError, ValidationError};

/// What to do when an item fails field-length validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// Return the validation error to the caller
    Fatal,
    /// Log the error and continue with the next item
    Skip,
}

/// Result of persisting one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Skipped,
}

/// Counts of persisted and skipped comments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveTally {
    pub saved: usize,
    pub skipped: usize,
}

impl SaveTally {
    pub fn add(&mut self, other: SaveTally) {
        self.saved += other.saved;
        self.skipped += other.skipped;
    }
}

/// Upserts a post
///
/// Errors other than validation failures are logged and the post is skipped,
/// whatever the policy.
pub fn save_post(
    repo: &dyn ItemRepository,
    post: &ForumPost,
    policy: ValidationPolicy,
) -> Result<SaveOutcome, ValidationError> {
    let record = PostRecord {
        id: post.id.clone(),
        forum: post.forum.clone(),
        title: post.title.clone(),
        created_at: post.created_at,
    };

    match repo.upsert_post(&record) {
        Ok(()) => Ok(SaveOutcome::Saved),
        Err(StorageError::Validation(e)) => {
            tracing::warn!(
                post_id = %record.id,
                id_len = record.id.chars().count(),
                forum_len = record.forum.chars().count(),
                title_len = record.title.chars().count(),
                field = e.field,
                limit = e.limit,
                "Post failed validation"
            );
            match policy {
                ValidationPolicy::Fatal => Err(e),
                ValidationPolicy::Skip => Ok(SaveOutcome::Skipped),
            }
        }
        Err(e) => {
            tracing::error!(post_id = %record.id, "Failed to save post: {}", e);
            Ok(SaveOutcome::Skipped)
        }
    }
}

/// Upserts a single comment under `post_id`
pub fn save_comment(
    repo: &dyn ItemRepository,
    post_id: &str,
    forum: &str,
    comment: &ForumComment,
    policy: ValidationPolicy,
) -> Result<SaveOutcome, ValidationError> {
    let record = CommentRecord {
        id: comment.id.clone(),
        post_id: post_id.to_string(),
        forum: forum.to_string(),
        body: comment.body.clone(),
        created_at: comment.created_at,
    };

    match repo.upsert_comment(&record) {
        Ok(()) => Ok(SaveOutcome::Saved),
        Err(StorageError::Validation(e)) => {
            tracing::warn!(
                post_id,
                comment_id = %record.id,
                id_len = record.id.chars().count(),
                body_len = record.body.chars().count(),
                field = e.field,
                limit = e.limit,
                "Comment failed validation"
            );
            match policy {
                ValidationPolicy::Fatal => Err(e),
                ValidationPolicy::Skip => Ok(SaveOutcome::Skipped),
            }
        }
        Err(e) => {
            tracing::error!(post_id, comment_id = %record.id, "Failed to save comment: {}", e);
            Ok(SaveOutcome::Skipped)
        }
    }
}

/// Upserts a sequence of comments, stopping only on a fatal validation error
pub fn save_comments<'a>(
    repo: &dyn ItemRepository,
    post_id: &str,
    forum: &str,
    comments: impl IntoIterator<Item = &'a ForumComment>,
    policy: ValidationPolicy,
) -> Result<SaveTally, ValidationError> {
    let mut tally = SaveTally::default();
    for comment in comments {
        match save_comment(repo, post_id, forum, comment, policy)? {
            SaveOutcome::Saved => tally.saved += 1,
            SaveOutcome::Skipped => tally.skipped += 1,
        }
    }
    Ok(tally)
}
