//! Comment tree walking
//!
//! Fetches a post's comment forest, expands every "more" placeholder until
//! none are left, and exposes the result as a lazily iterated set of
//! comments newer than an optional cutoff.

use crate::forum::{ApiError, CommentNode, ForumApi, ForumComment, ForumPost};
use crate::Timestamp;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Errors that abort the walk of a single post
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("Forum API error while walking post {post_id}: {source}")]
    Api {
        post_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Post {post_id} still has {remaining} placeholders after {rounds} expansion rounds")]
    NotConverged {
        post_id: String,
        rounds: u32,
        remaining: usize,
    },
}

/// Produces the fully expanded comment set of a post
///
/// The walker holds no state between walks; each call starts from a fresh
/// comment forest.
#[derive(Clone)]
pub struct CommentTreeWalker {
    api: Arc<dyn ForumApi>,
    max_rounds: u32,
}

impl CommentTreeWalker {
    /// Creates a walker
    ///
    /// # Arguments
    ///
    /// * `api` - Forum API used for fetching and expanding
    /// * `max_rounds` - Upper bound on placeholder expansion rounds per post
    pub fn new(api: Arc<dyn ForumApi>, max_rounds: u32) -> Self {
        Self { api, max_rounds }
    }

    /// Walks a post's comments
    ///
    /// # Arguments
    ///
    /// * `post` - The post whose comments are walked
    /// * `since` - Only comments created strictly after this are yielded; `None` yields all
    ///
    /// # Returns
    ///
    /// * `Ok(CommentThread)` - Forest with no placeholders left
    /// * `Err(WalkError)` - An API call failed or expansion did not converge
    pub async fn walk(
        &self,
        post: &ForumPost,
        since: Option<Timestamp>,
    ) -> Result<CommentThread, WalkError> {
        let mut forest = self
            .api
            .comment_forest(post)
            .await
            .map_err(|source| WalkError::Api {
                post_id: post.id.clone(),
                source,
            })?;

        let rounds = self.expand_all(post, &mut forest).await?;
        tracing::debug!(
            post_id = %post.id,
            rounds,
            "Comment forest fully expanded"
        );

        Ok(CommentThread { forest, since })
    }

    /// Expands placeholders round by round until none remain
    ///
    /// An expansion may itself return placeholders, which are picked up by the
    /// next round.
    async fn expand_all(
        &self,
        post: &ForumPost,
        forest: &mut Vec<CommentNode>,
    ) -> Result<u32, WalkError> {
        for round in 0..self.max_rounds {
            let paths = placeholder_paths(forest);
            if paths.is_empty() {
                return Ok(round);
            }
            tracing::trace!(
                post_id = %post.id,
                round,
                placeholders = paths.len(),
                "Expanding placeholders"
            );

            // Reverse pre-order: splicing a later placeholder never shifts the
            // path of an earlier one
            for path in paths.iter().rev() {
                let more = match node_at(forest, path) {
                    Some(CommentNode::More(more)) => more.clone(),
                    _ => continue,
                };
                let expanded =
                    self.api
                        .expand_more(post, &more)
                        .await
                        .map_err(|source| WalkError::Api {
                            post_id: post.id.clone(),
                            source,
                        })?;
                replace_at(forest, path, expanded);
            }
        }

        let remaining = placeholder_paths(forest).len();
        if remaining == 0 {
            Ok(self.max_rounds)
        } else {
            Err(WalkError::NotConverged {
                post_id: post.id.clone(),
                rounds: self.max_rounds,
                remaining,
            })
        }
    }
}

/// Collects the index path of every placeholder, in pre-order
fn placeholder_paths(forest: &[CommentNode]) -> Vec<Vec<usize>> {
    fn visit(nodes: &[CommentNode], prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        for (index, node) in nodes.iter().enumerate() {
            prefix.push(index);
            match node {
                CommentNode::More(_) => out.push(prefix.clone()),
                CommentNode::Comment(comment) => visit(&comment.replies, prefix, out),
            }
            prefix.pop();
        }
    }

    let mut out = Vec::new();
    visit(forest, &mut Vec::new(), &mut out);
    out
}

fn node_at<'a>(forest: &'a [CommentNode], path: &[usize]) -> Option<&'a CommentNode> {
    let (last, parents) = path.split_last()?;
    let mut nodes = forest;
    for &index in parents {
        nodes = match nodes.get(index) {
            Some(CommentNode::Comment(comment)) => &comment.replies,
            _ => return None,
        };
    }
    nodes.get(*last)
}

/// Replaces the node at `path` with `replacement`, in place
fn replace_at(forest: &mut Vec<CommentNode>, path: &[usize], replacement: Vec<CommentNode>) {
    let Some((&last, parents)) = path.split_last() else {
        return;
    };
    let mut nodes = forest;
    for &index in parents {
        nodes = match nodes.get_mut(index) {
            Some(CommentNode::Comment(comment)) => &mut comment.replies,
            _ => return,
        };
    }
    if last < nodes.len() {
        nodes.splice(last..=last, replacement);
    }
}

/// A fully expanded comment forest together with its cutoff
#[derive(Debug, Clone)]
pub struct CommentThread {
    forest: Vec<CommentNode>,
    since: Option<Timestamp>,
}

impl CommentThread {
    /// The cutoff this thread was walked with
    pub fn since(&self) -> Option<Timestamp> {
        self.since
    }

    /// Lazily iterates the comments that pass the cutoff, each id at most once
    ///
    /// Top-level comments are assumed newest first: the first one at or before
    /// the cutoff ends the top-level scan. Replies are checked one by one,
    /// including replies under top-level comments that were cut off. Every
    /// call starts a fresh pass.
    pub fn iter(&self) -> ThreadIter<'_> {
        ThreadIter {
            stack: vec![self.forest.iter()],
            since: self.since,
            top_level_done: false,
            seen: HashSet::new(),
        }
    }

    /// Comments that pass the cutoff, oldest first
    pub fn ascending(&self) -> Vec<&ForumComment> {
        let mut comments: Vec<&ForumComment> = self.iter().collect();
        comments.sort_by(|a, b| {
            a.created_at
                .total_cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        comments
    }

    /// Number of comments that pass the cutoff
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Pre-order iterator over a [`CommentThread`]
pub struct ThreadIter<'a> {
    stack: Vec<std::slice::Iter<'a, CommentNode>>,
    since: Option<Timestamp>,
    top_level_done: bool,
    seen: HashSet<&'a str>,
}

impl<'a> ThreadIter<'a> {
    fn is_new(&self, comment: &ForumComment) -> bool {
        self.since.map_or(true, |since| comment.created_at > since)
    }
}

impl<'a> Iterator for ThreadIter<'a> {
    type Item = &'a ForumComment;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let depth = self.stack.len();
            let level = self.stack.last_mut()?;
            let Some(node) = level.next() else {
                self.stack.pop();
                continue;
            };
            let CommentNode::Comment(comment) = node else {
                continue;
            };

            if !comment.replies.is_empty() {
                self.stack.push(comment.replies.iter());
            }

            let eligible = if depth == 1 {
                if !self.top_level_done && !self.is_new(comment) {
                    self.top_level_done = true;
                }
                !self.top_level_done
            } else {
                self.is_new(comment)
            };

            if eligible && self.seen.insert(comment.id.as_str()) {
                return Some(comment);
            }
        }
    }
}
