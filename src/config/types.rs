use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Thread-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "forum-api")]
    pub forum_api: ForumApiConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,

    /// Forum names to crawl
    #[serde(default)]
    pub forums: Vec<String>,

    /// Optional JSON forum listing whose entries are appended to `forums`
    #[serde(rename = "forums-file", default)]
    pub forums_file: Option<PathBuf>,
}

/// Crawl cycle behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Seconds between the starts of two consecutive cycles
    #[serde(rename = "interval-secs", default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Upper bound on "more comments" expansion rounds per post
    #[serde(rename = "max-expansion-rounds", default = "default_max_expansion_rounds")]
    pub max_expansion_rounds: u32,

    /// Number of forums synced in parallel
    #[serde(rename = "max-concurrent-forums", default = "default_max_concurrent_forums")]
    pub max_concurrent_forums: u32,

    /// Number of posts walked in parallel within one forum
    #[serde(rename = "max-concurrent-posts", default = "default_max_concurrent_posts")]
    pub max_concurrent_posts: u32,

    /// Pause before the supervisor rebuilds a failed scheduler
    #[serde(rename = "restart-delay-secs", default = "default_restart_delay_secs")]
    pub restart_delay_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_expansion_rounds: default_max_expansion_rounds(),
            max_concurrent_forums: default_max_concurrent_forums(),
            max_concurrent_posts: default_max_concurrent_posts(),
            restart_delay_secs: default_restart_delay_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_max_expansion_rounds() -> u32 {
    32
}

fn default_max_concurrent_forums() -> u32 {
    4
}

fn default_max_concurrent_posts() -> u32 {
    8
}

fn default_restart_delay_secs() -> u64 {
    5
}

/// Forum API endpoint and credential configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ForumApiConfig {
    /// Base URL of the authenticated API
    #[serde(rename = "api-url", default = "default_api_url")]
    pub api_url: String,

    /// OAuth token endpoint
    #[serde(rename = "auth-url", default = "default_auth_url")]
    pub auth_url: String,

    #[serde(rename = "client-id")]
    pub client_id: String,

    #[serde(rename = "client-secret")]
    pub client_secret: String,

    pub username: String,

    pub password: String,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://oauth.reddit.com".to_string()
}

fn default_auth_url() -> String {
    "https://www.reddit.com/api/v1/access_token".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Read API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address the read API listens on
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}
