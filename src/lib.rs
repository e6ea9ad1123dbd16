//! Thread-Harvest: an incremental forum crawler
//!
//! This crate harvests new posts and their full comment trees from a fixed set
//! of forums on a recurring schedule and persists every item exactly once into
//! a queryable SQLite store. A small read-only HTTP API serves what was stored.

pub mod config;
pub mod crawler;
pub mod forum;
pub mod output;
pub mod state;
pub mod storage;
pub mod web;

use thiserror::Error;

/// Unix timestamp in seconds, fractional part allowed
pub type Timestamp = f64;

/// Returns the current wall-clock time as a Unix timestamp
pub fn unix_now() -> Timestamp {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Main error type for Thread-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Forum API error: {0}")]
    Api(#[from] forum::ApiError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Cycle finished with fatal errors in forums: {}", forums.join(", "))]
    FatalCycle { forums: Vec<String> },

    #[error("Scheduler panicked: {0}")]
    Panicked(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse forum listing: {0}")]
    Listing(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Thread-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CommentTreeWalker, Scheduler};
pub use forum::{CommentNode, FetchOutcome, ForumApi, ForumComment, ForumPost, MoreComments};
pub use state::WatermarkStore;
pub use storage::{ItemRepository, SqliteRepository};
