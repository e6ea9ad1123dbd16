use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// When `forums-file` is set, the listing it points to (resolved relative to
/// the configuration file) is merged into `forums` before validation.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use thread_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Forums: {:?}", config.forums);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;

    if let Some(listing_path) = config.forums_file.clone() {
        let listing_path = match path.parent() {
            Some(dir) if listing_path.is_relative() => dir.join(listing_path),
            _ => listing_path,
        };
        let listing = std::fs::read_to_string(&listing_path)?;
        let names = parse_forum_listing(&listing)?;
        tracing::debug!(
            "Loaded {} forums from {}",
            names.len(),
            listing_path.display()
        );
        config.forums.extend(names);
    }

    dedup_preserving_order(&mut config.forums);
    validate(&config)?;

    Ok(config)
}

#[derive(Deserialize)]
struct ForumListing {
    data: ForumListingData,
}

#[derive(Deserialize)]
struct ForumListingData {
    children: Vec<ForumListingChild>,
}

#[derive(Deserialize)]
struct ForumListingChild {
    data: ForumListingEntry,
}

#[derive(Deserialize)]
struct ForumListingEntry {
    display_name: String,
}

/// Extracts forum names from a listing document
///
/// The document has the shape the forum API uses for subreddit listings:
/// `{"data": {"children": [{"data": {"display_name": "..."}}]}}`.
pub fn parse_forum_listing(json: &str) -> Result<Vec<String>, ConfigError> {
    let listing: ForumListing = serde_json::from_str(json)?;
    Ok(listing
        .data
        .children
        .into_iter()
        .map(|child| child.data.display_name)
        .collect())
}

fn dedup_preserving_order(forums: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    forums.retain(|forum| seen.insert(forum.clone()));
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so operators can tell which configuration a run used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
