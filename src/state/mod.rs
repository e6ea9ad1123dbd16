//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `WatermarkStore`: Per-forum end of the last cleanly processed window

mod watermark;

pub use watermark::WatermarkStore;
