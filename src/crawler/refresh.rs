//! Refresh: pull newer comments for posts already in the store

use crate::crawler::persist::{save_comments, SaveTally, ValidationPolicy};
use crate::crawler::report::RefreshReport;
use crate::crawler::CrawlContext;
use crate::forum::FetchOutcome;
use crate::storage::{PostRecord, StorageResult};
use futures::stream::{self, StreamExt};

enum RefreshOutcome {
    Refreshed(SaveTally),
    NotFound,
    Forbidden,
    Failed,
}

/// Revisits every stored post and saves comments newer than its newest stored one
///
/// Posts that are gone, restricted or fail to load are logged and skipped;
/// nothing stored is ever removed. Only a failure to enumerate the stored
/// posts is returned as an error.
pub async fn refresh_known_posts(ctx: &CrawlContext) -> StorageResult<RefreshReport> {
    let posts = ctx.repo.list_posts()?;
    let mut report = RefreshReport {
        visited: posts.len(),
        ..Default::default()
    };
    tracing::debug!(posts = posts.len(), "Refreshing known posts");

    let mut visits = stream::iter(posts.iter())
        .map(|post| refresh_post(ctx, post))
        .buffer_unordered(ctx.max_concurrent_posts);

    while let Some(outcome) = visits.next().await {
        match outcome {
            RefreshOutcome::Refreshed(tally) => {
                report.refreshed += 1;
                report.comments.add(tally);
            }
            RefreshOutcome::NotFound => report.not_found += 1,
            RefreshOutcome::Forbidden => report.forbidden += 1,
            RefreshOutcome::Failed => report.failed += 1,
        }
    }

    Ok(report)
}

async fn refresh_post(ctx: &CrawlContext, stored: &PostRecord) -> RefreshOutcome {
    let since = match ctx.repo.max_comment_timestamp(&stored.id) {
        Ok(since) => since,
        Err(e) => {
            tracing::error!(post_id = %stored.id, "Failed to read newest comment: {}", e);
            return RefreshOutcome::Failed;
        }
    };

    let post = match ctx.api.fetch_post(&stored.id).await {
        FetchOutcome::Found(post) => post,
        FetchOutcome::NotFound => {
            tracing::warn!(post_id = %stored.id, "Post no longer exists, keeping stored copy");
            return RefreshOutcome::NotFound;
        }
        FetchOutcome::Forbidden => {
            tracing::warn!(post_id = %stored.id, "Access to post is forbidden, skipping");
            return RefreshOutcome::Forbidden;
        }
        FetchOutcome::Failed(detail) => {
            tracing::error!(post_id = %stored.id, "Failed to fetch post: {}", detail);
            return RefreshOutcome::Failed;
        }
    };

    let thread = match ctx.walker.walk(&post, since).await {
        Ok(thread) => thread,
        Err(e) => {
            tracing::error!(post_id = %stored.id, "Failed to walk comments: {}", e);
            return RefreshOutcome::Failed;
        }
    };

    match save_comments(
        ctx.repo.as_ref(),
        &stored.id,
        &stored.forum,
        thread.ascending(),
        ValidationPolicy::Skip,
    ) {
        Ok(tally) => {
            if tally.saved > 0 {
                tracing::debug!(post_id = %stored.id, saved = tally.saved, "New comments saved");
            }
            RefreshOutcome::Refreshed(tally)
        }
        Err(e) => {
            tracing::error!(post_id = %stored.id, "Failed to save comments: {}", e);
            RefreshOutcome::Failed
        }
    }
}
