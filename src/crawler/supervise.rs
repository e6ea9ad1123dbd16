//! Outer restart loop around the scheduler

use crate::crawler::Scheduler;
use crate::HarvestError;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

/// Rebuilds and reruns a scheduler whenever its run fails
///
/// Every restart builds a fresh scheduler, so watermarks start over and the
/// first cycle of the new run takes "now" as its baseline.
#[derive(Debug, Clone)]
pub struct Supervisor {
    restart_delay: Duration,
    max_restarts: Option<u32>,
}

impl Supervisor {
    /// Creates a supervisor that restarts forever
    pub fn new(restart_delay: Duration) -> Self {
        Self {
            restart_delay,
            max_restarts: None,
        }
    }

    /// Gives up after `max_restarts` restarts, returning the last error
    pub fn with_max_restarts(mut self, max_restarts: u32) -> Self {
        self.max_restarts = Some(max_restarts);
        self
    }

    /// Runs schedulers produced by `build` until the restart limit is hit
    ///
    /// A failure to build a scheduler is handled like a failed run, and so is
    /// a panic raised while the scheduler runs.
    pub async fn run<F>(&self, mut build: F) -> Result<(), HarvestError>
    where
        F: FnMut() -> Result<Scheduler, HarvestError>,
    {
        let mut restarts: u32 = 0;
        loop {
            let result = match build() {
                Ok(scheduler) => AssertUnwindSafe(scheduler.run())
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(HarvestError::Panicked(panic_message(payload)))),
                Err(e) => Err(e),
            };

            let error = match result {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            if self.max_restarts.is_some_and(|max| restarts >= max) {
                tracing::error!(restarts, "Giving up after error: {}", error);
                return Err(error);
            }

            restarts += 1;
            tracing::error!(
                restarts,
                delay_secs = self.restart_delay.as_secs_f64(),
                "Scheduler stopped, restarting: {}",
                error
            );
            tokio::time::sleep(self.restart_delay).await;
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
