//! Scheduler for driving crawl cycles
//!
//! This module handles:
//! - Running one cycle: refresh of known posts, then sync of every forum
//! - Bounded parallelism across forums
//! - Advancing each forum's watermark only after a clean sync
//! - Waiting for the configured interval between cycle starts

use crate::config::{Config, CrawlerConfig};
use crate::crawler::refresh::refresh_known_posts;
use crate::crawler::report::{CycleReport, ForumStatus};
use crate::crawler::sync::sync_forum;
use crate::crawler::CrawlContext;
use crate::forum::ForumApi;
use crate::state::WatermarkStore;
use crate::storage::ItemRepository;
use crate::{unix_now, HarvestError, Timestamp};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;

/// Source of cycle start timestamps
pub type Clock = Arc<dyn Fn() -> Timestamp + Send + Sync>;

/// Drives crawl cycles for a fixed set of forums
///
/// A scheduler owns its watermark store; building a new scheduler starts
/// from an empty one.
pub struct Scheduler {
    settings: CrawlerConfig,
    forums: Vec<String>,
    ctx: CrawlContext,
    watermarks: WatermarkStore,
    clock: Clock,
    last_cycle_start: Option<Instant>,
    cycles: u64,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `settings` - Cycle interval and concurrency limits
    /// * `forums` - Forums synced every cycle, in order
    /// * `api` - Forum API client
    /// * `repo` - Item repository shared by all tasks
    pub fn new(
        settings: CrawlerConfig,
        forums: Vec<String>,
        api: Arc<dyn ForumApi>,
        repo: Arc<dyn ItemRepository>,
    ) -> Self {
        let ctx = CrawlContext::new(api, repo, &settings);
        Self {
            settings,
            forums,
            ctx,
            watermarks: WatermarkStore::new(),
            clock: Arc::new(unix_now),
            last_cycle_start: None,
            cycles: 0,
        }
    }

    /// Creates a scheduler from a loaded configuration
    pub fn from_config(config: &Config, api: Arc<dyn ForumApi>, repo: Arc<dyn ItemRepository>) -> Self {
        Self::new(config.crawler.clone(), config.forums.clone(), api, repo)
    }

    /// Replaces the wall clock used to stamp cycles started by [`Scheduler::run`]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn watermarks(&self) -> &WatermarkStore {
        &self.watermarks
    }

    pub fn forums(&self) -> &[String] {
        &self.forums
    }

    /// Number of cycles run so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(self.settings.interval_secs)
    }

    /// Instant at which the next cycle becomes due, if a cycle has run
    pub fn next_due(&self) -> Option<Instant> {
        self.last_cycle_start.map(|last| last + self.interval())
    }

    /// Returns true if a cycle should start at `now`
    ///
    /// The first cycle is due immediately; later ones once the interval has
    /// elapsed since the previous cycle started.
    pub fn is_due(&self, now: Instant) -> bool {
        self.next_due().map_or(true, |due| now >= due)
    }

    /// Runs one cycle starting now
    pub async fn run_cycle(&mut self) -> Result<CycleReport, HarvestError> {
        let started_at = (self.clock)();
        self.run_cycle_at(started_at).await
    }

    /// Runs one cycle with `started_at` as the cycle's start timestamp
    ///
    /// Forum windows end at `started_at`, and forums whose sync completes have
    /// their watermark moved to it. Returns an error only when the refresh
    /// pass cannot enumerate stored posts; fatal forum errors are reported in
    /// the [`CycleReport`].
    pub async fn run_cycle_at(&mut self, started_at: Timestamp) -> Result<CycleReport, HarvestError> {
        self.last_cycle_start = Some(Instant::now());
        self.cycles += 1;

        let span = tracing::info_span!("cycle", started_at, cycle = self.cycles);
        tracing::info!(parent: &span, forums = self.forums.len(), "Cycle started");

        let refresh = match refresh_known_posts(&self.ctx)
            .instrument(tracing::info_span!(parent: &span, "refresh"))
            .await
        {
            Ok(report) => report,
            Err(e) => return Err(e.into()),
        };

        let jobs: Vec<_> = self
            .forums
            .iter()
            .enumerate()
            .map(|(index, forum)| {
                (
                    index,
                    forum.clone(),
                    self.watermarks.window_for(forum, started_at),
                )
            })
            .collect();

        let ctx = &self.ctx;
        let parent = &span;
        let mut forums: Vec<_> = stream::iter(jobs)
            .map(|(index, forum, window)| async move {
                let span = tracing::info_span!(parent: parent, "forum_sync", forum = %forum);
                let report = sync_forum(ctx, &forum, window).instrument(span).await;
                (index, report)
            })
            .buffer_unordered(self.settings.max_concurrent_forums.max(1) as usize)
            .collect()
            .await;
        forums.sort_by_key(|(index, _)| *index);
        let forums: Vec<_> = forums.into_iter().map(|(_, report)| report).collect();

        for report in &forums {
            if report.status == ForumStatus::Completed {
                self.watermarks.advance(&report.forum, started_at);
            }
        }

        Ok(CycleReport {
            started_at,
            refresh,
            forums,
        })
    }

    /// Runs cycles until one fails
    ///
    /// The first cycle starts immediately, later ones one interval after the
    /// previous start. A cycle with a fatal forum error still finishes (other
    /// forums' watermarks advance) before this returns
    /// [`HarvestError::FatalCycle`].
    pub async fn run(mut self) -> Result<(), HarvestError> {
        loop {
            if !self.is_due(Instant::now()) {
                if let Some(due) = self.next_due() {
                    tracing::debug!(cycles = self.cycles, "Waiting for next cycle");
                    tokio::time::sleep_until(due).await;
                }
            }

            let report = self.run_cycle().await?;
            report.log_summary();

            let fatal = report.fatal_forums();
            if !fatal.is_empty() {
                return Err(HarvestError::FatalCycle { forums: fatal });
            }
        }
    }
}
