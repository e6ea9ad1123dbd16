//! Forum sync: ingest the posts of one forum created within a window

use crate::crawler::persist::{save_comments, save_post, SaveOutcome, SaveTally, ValidationPolicy};
use crate::crawler::report::{ForumReport, ForumStatus};
use crate::crawler::CrawlContext;
use crate::forum::{ForumPost, TimeWindow};
use crate::storage::ValidationError;
use futures::stream::{self, StreamExt};

enum PostIngest {
    Skipped,
    Saved { comments: SaveTally, walk_failed: bool },
}

/// Syncs one forum for the given window
///
/// Each listed post is saved and its whole comment tree walked. Posts are
/// processed concurrently up to the configured limit. A post that fails
/// validation aborts the forum with [`ForumStatus::Fatal`]; every other
/// per-post or per-comment failure is logged and skipped.
pub async fn sync_forum(ctx: &CrawlContext, forum: &str, window: TimeWindow) -> ForumReport {
    let mut report = ForumReport::new(forum, window);

    let posts = match ctx.api.list_posts(forum, window).await {
        Ok(posts) => posts,
        Err(e) => {
            tracing::error!(forum, "Failed to list posts: {}", e);
            report.status = ForumStatus::Unavailable(e.to_string());
            return report;
        }
    };
    report.posts_seen = posts.len();
    tracing::debug!(
        forum,
        start = window.start,
        end = window.end,
        posts = posts.len(),
        "Listed posts"
    );

    let mut ingests = stream::iter(posts.iter())
        .map(|post| ingest_post(ctx, post))
        .buffer_unordered(ctx.max_concurrent_posts);

    while let Some(result) = ingests.next().await {
        match result {
            Ok(PostIngest::Skipped) => report.posts_skipped += 1,
            Ok(PostIngest::Saved {
                comments,
                walk_failed,
            }) => {
                report.posts_saved += 1;
                report.comments.add(comments);
                if walk_failed {
                    report.walk_failures += 1;
                }
            }
            Err(e) => {
                report.status = ForumStatus::Fatal(e);
                return report;
            }
        }
    }

    report
}

async fn ingest_post(ctx: &CrawlContext, post: &ForumPost) -> Result<PostIngest, ValidationError> {
    if save_post(ctx.repo.as_ref(), post, ValidationPolicy::Fatal)? == SaveOutcome::Skipped {
        return Ok(PostIngest::Skipped);
    }

    let thread = match ctx.walker.walk(post, None).await {
        Ok(thread) => thread,
        Err(e) => {
            tracing::warn!(post_id = %post.id, "Skipping comments: {}", e);
            return Ok(PostIngest::Saved {
                comments: SaveTally::default(),
                walk_failed: true,
            });
        }
    };

    let comments = save_comments(
        ctx.repo.as_ref(),
        &post.id,
        &post.forum,
        thread.ascending(),
        ValidationPolicy::Skip,
    )?;
    tracing::debug!(
        post_id = %post.id,
        saved = comments.saved,
        skipped = comments.skipped,
        "Post ingested"
    );

    Ok(PostIngest::Saved {
        comments,
        walk_failed: false,
    })
}
