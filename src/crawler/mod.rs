//! Crawl engine
//!
//! This module contains the incremental crawl logic, including:
//! - Walking and fully expanding comment trees
//! - Syncing new posts of a forum within a watermark window
//! - Refreshing already stored posts with their newer comments
//! - Scheduling cycles and restarting after fatal errors

mod persist;
mod refresh;
mod report;
mod scheduler;
mod supervise;
mod sync;
mod walker;

pub use persist::{save_comment, save_comments, save_post, SaveOutcome, SaveTally, ValidationPolicy};
pub use refresh::refresh_known_posts;
pub use report::{CycleReport, ForumReport, ForumStatus, RefreshReport};
pub use scheduler::{Clock, Scheduler};
pub use supervise::Supervisor;
pub use sync::sync_forum;
pub use walker::{CommentThread, CommentTreeWalker, ThreadIter, WalkError};

use crate::config::CrawlerConfig;
use crate::forum::ForumApi;
use crate::storage::ItemRepository;
use std::sync::Arc;

/// Collaborators shared by the sync and refresh tasks of a cycle
#[derive(Clone)]
pub struct CrawlContext {
    pub api: Arc<dyn ForumApi>,
    pub repo: Arc<dyn ItemRepository>,
    pub walker: CommentTreeWalker,
    pub max_concurrent_posts: usize,
}

impl CrawlContext {
    /// Creates a context from the crawler settings
    pub fn new(
        api: Arc<dyn ForumApi>,
        repo: Arc<dyn ItemRepository>,
        settings: &CrawlerConfig,
    ) -> Self {
        let walker = CommentTreeWalker::new(Arc::clone(&api), settings.max_expansion_rounds);
        Self {
            api,
            repo,
            walker,
            max_concurrent_posts: settings.max_concurrent_posts.max(1) as usize,
        }
    }
}
