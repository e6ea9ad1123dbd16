//! In-memory forum used by tests
//!
//! The fixture holds posts, comment forests and placeholder expansions in
//! memory and answers `ForumApi` calls from them. Individual posts can be
//! marked deleted, forbidden or failing, and whole forums can be made
//! unavailable, so every branch of the crawl engine can be driven
//! deterministically.

use crate::forum::{
    ApiError, CommentNode, FetchOutcome, ForumApi, ForumComment, ForumPost, MoreComments,
    TimeWindow,
};
use crate::Timestamp;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct FixtureState {
    posts: Vec<ForumPost>,
    forests: HashMap<String, Vec<CommentNode>>,
    expansions: HashMap<String, Vec<CommentNode>>,
    deleted: HashSet<String>,
    forbidden: HashSet<String>,
    failing: HashSet<String>,
    unavailable_forums: HashSet<String>,
    listing_requests: Vec<(String, TimeWindow)>,
    expansion_requests: usize,
}

/// A forum served from memory
#[derive(Debug, Default)]
pub struct FixtureForum {
    state: Mutex<FixtureState>,
}

impl FixtureForum {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FixtureState> {
        // A panicking test thread must not hide the fixture from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Builds a comment node with no author and a generated body
    pub fn comment(id: &str, created_at: Timestamp, replies: Vec<CommentNode>) -> CommentNode {
        Self::comment_with_body(id, created_at, &format!("comment {}", id), replies)
    }

    /// Builds a comment node with an explicit body
    pub fn comment_with_body(
        id: &str,
        created_at: Timestamp,
        body: &str,
        replies: Vec<CommentNode>,
    ) -> CommentNode {
        CommentNode::Comment(ForumComment {
            id: id.to_string(),
            parent_id: None,
            author: None,
            body: body.to_string(),
            created_at,
            replies,
        })
    }

    /// Builds a placeholder node; register its content with [`FixtureForum::add_expansion`]
    pub fn more(id: &str, parent_id: &str, children: &[&str]) -> CommentNode {
        CommentNode::More(MoreComments {
            id: id.to_string(),
            parent_id: parent_id.to_string(),
            children: children.iter().map(|c| c.to_string()).collect(),
            count: children.len() as u32,
        })
    }

    /// Adds a post and its comment forest
    pub fn add_post(&self, post: ForumPost, forest: Vec<CommentNode>) {
        let mut state = self.lock();
        state.forests.insert(post.id.clone(), forest);
        state.posts.retain(|existing| existing.id != post.id);
        state.posts.push(post);
    }

    /// Replaces the comment forest of a known post
    pub fn set_forest(&self, post_id: &str, forest: Vec<CommentNode>) {
        self.lock().forests.insert(post_id.to_string(), forest);
    }

    /// Registers what a placeholder expands to
    pub fn add_expansion(&self, more_id: &str, nodes: Vec<CommentNode>) {
        self.lock().expansions.insert(more_id.to_string(), nodes);
    }

    /// Makes a post look deleted upstream
    pub fn delete_post(&self, post_id: &str) {
        self.lock().deleted.insert(post_id.to_string());
    }

    /// Makes a post look access-restricted
    pub fn forbid_post(&self, post_id: &str) {
        self.lock().forbidden.insert(post_id.to_string());
    }

    /// Makes every request about a post fail transiently
    pub fn fail_post(&self, post_id: &str) {
        self.lock().failing.insert(post_id.to_string());
    }

    /// Makes listing a forum fail
    pub fn make_unavailable(&self, forum: &str) {
        self.lock().unavailable_forums.insert(forum.to_string());
    }

    /// Every `(forum, window)` passed to `list_posts`, in call order
    pub fn listing_requests(&self) -> Vec<(String, TimeWindow)> {
        self.lock().listing_requests.clone()
    }

    /// Number of placeholder expansions served so far
    pub fn expansion_requests(&self) -> usize {
        self.lock().expansion_requests
    }
}

#[async_trait]
impl ForumApi for FixtureForum {
    async fn list_posts(&self, forum: &str, window: TimeWindow) -> Result<Vec<ForumPost>, ApiError> {
        let mut state = self.lock();
        state.listing_requests.push((forum.to_string(), window));

        if state.unavailable_forums.contains(forum) {
            return Err(ApiError::Unavailable(format!("forum {} is unavailable", forum)));
        }

        let mut posts: Vec<ForumPost> = state
            .posts
            .iter()
            .filter(|post| post.forum == forum && window.contains(post.created_at))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.total_cmp(&a.created_at));
        Ok(posts)
    }

    async fn fetch_post(&self, post_id: &str) -> FetchOutcome {
        let state = self.lock();
        if state.deleted.contains(post_id) {
            return FetchOutcome::NotFound;
        }
        if state.forbidden.contains(post_id) {
            return FetchOutcome::Forbidden;
        }
        if state.failing.contains(post_id) {
            return FetchOutcome::Failed(format!("transient failure fetching {}", post_id));
        }
        state
            .posts
            .iter()
            .find(|post| post.id == post_id)
            .cloned()
            .map(FetchOutcome::Found)
            .unwrap_or(FetchOutcome::NotFound)
    }

    async fn comment_forest(&self, post: &ForumPost) -> Result<Vec<CommentNode>, ApiError> {
        let state = self.lock();
        if state.failing.contains(&post.id) {
            return Err(ApiError::Timeout {
                url: format!("fixture://comments/{}", post.id),
            });
        }
        Ok(state.forests.get(&post.id).cloned().unwrap_or_default())
    }

    async fn expand_more(
        &self,
        post: &ForumPost,
        more: &MoreComments,
    ) -> Result<Vec<CommentNode>, ApiError> {
        let mut state = self.lock();
        state.expansion_requests += 1;
        state
            .expansions
            .get(&more.id)
            .cloned()
            .ok_or_else(|| ApiError::UnexpectedShape {
                url: format!("fixture://morechildren/{}", post.id),
                message: format!("no expansion registered for {}", more.id),
            })
    }
}
