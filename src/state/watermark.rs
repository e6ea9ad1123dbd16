use crate::forum::TimeWindow;
use crate::Timestamp;
use std::collections::HashMap;

/// Tracks, per forum, the start time of the last cycle whose sync completed
///
/// The store lives only as long as the scheduler that owns it. A forum with no
/// entry has never completed a sync in this process.
#[derive(Debug, Clone, Default)]
pub struct WatermarkStore {
    marks: HashMap<String, Timestamp>,
}

impl WatermarkStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the watermark of a forum
    pub fn get(&self, forum: &str) -> Option<Timestamp> {
        self.marks.get(forum).copied()
    }

    /// Sets the watermark of a forum, replacing any previous value
    pub fn set(&mut self, forum: &str, timestamp: Timestamp) {
        self.marks.insert(forum.to_string(), timestamp);
    }

    /// Moves the watermark of a forum forward
    ///
    /// A timestamp older than the current watermark is ignored.
    ///
    /// # Returns
    ///
    /// `true` if the stored value changed
    pub fn advance(&mut self, forum: &str, timestamp: Timestamp) -> bool {
        match self.get(forum) {
            Some(current) if current >= timestamp => false,
            _ => {
                self.set(forum, timestamp);
                true
            }
        }
    }

    /// Computes the sync window for a forum in a cycle starting at `now`
    ///
    /// The window runs from the watermark to `now`. Without a watermark it is
    /// the zero-width window `[now, now]`, so the first cycle only sets a
    /// baseline instead of backfilling history.
    pub fn window_for(&self, forum: &str, now: Timestamp) -> TimeWindow {
        TimeWindow::new(self.get(forum).unwrap_or(now), now)
    }

    /// Number of forums with a watermark
    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}
