//! Statistics generation from the item database
//!
//! This module provides functionality for extracting and displaying
//! per-forum item counts from the storage layer.

use crate::storage::{ForumCount, ItemRepository, StorageResult};

/// Store statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestStatistics {
    /// Total number of stored posts
    pub total_posts: u64,

    /// Total number of stored comments and replies
    pub total_comments: u64,

    /// Counts per forum, ordered by forum name
    pub forums: Vec<ForumCount>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `repo` - The repository to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(repo: &dyn ItemRepository) -> StorageResult<HarvestStatistics> {
    let forums = repo.forum_counts()?;
    let total_posts = forums.iter().map(|f| f.posts).sum();
    let total_comments = forums.iter().map(|f| f.comments).sum();

    Ok(HarvestStatistics {
        total_posts,
        total_comments,
        forums,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Total posts: {}", stats.total_posts);
    println!("  Total comments: {}", stats.total_comments);
    println!("  Forums: {}", stats.forums.len());
    println!();

    if stats.forums.is_empty() {
        println!("No items stored yet.");
        return;
    }

    println!("Items by Forum:");
    for forum in &stats.forums {
        let per_post = if forum.posts > 0 {
            forum.comments as f64 / forum.posts as f64
        } else {
            0.0
        };
        println!(
            "  {}: {} posts, {} comments ({:.1} per post)",
            forum.forum, forum.posts, forum.comments, per_post
        );
    }
}
