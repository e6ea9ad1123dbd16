use crate::config::types::{Config, CrawlerConfig, ForumApiConfig, ServerConfig, StorageConfig};
use crate::storage::MAX_FORUM_LEN;
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_forum_api_config(&config.forum_api)?;
    validate_storage_config(&config.storage)?;
    validate_server_config(&config.server)?;
    validate_forums(&config.forums)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.interval_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "interval_secs must be >= 1, got {}",
            config.interval_secs
        )));
    }

    if config.max_expansion_rounds < 1 {
        return Err(ConfigError::Validation(format!(
            "max_expansion_rounds must be >= 1, got {}",
            config.max_expansion_rounds
        )));
    }

    for (name, value) in [
        ("max_concurrent_forums", config.max_concurrent_forums),
        ("max_concurrent_posts", config.max_concurrent_posts),
    ] {
        if !(1..=64).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and 64, got {}",
                name, value
            )));
        }
    }

    Ok(())
}

/// Validates forum API endpoints and credentials
fn validate_forum_api_config(config: &ForumApiConfig) -> Result<(), ConfigError> {
    Url::parse(&config.api_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api_url: {}", e)))?;
    Url::parse(&config.auth_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid auth_url: {}", e)))?;

    for (name, value) in [
        ("client_id", &config.client_id),
        ("username", &config.username),
        ("user_agent", &config.user_agent),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates the read API bind address
fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.bind.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!("Invalid bind address '{}': {}", config.bind, e))
    })?;
    Ok(())
}

/// Validates the forum list
fn validate_forums(forums: &[String]) -> Result<(), ConfigError> {
    if forums.is_empty() {
        return Err(ConfigError::Validation(
            "At least one forum must be configured".to_string(),
        ));
    }

    for forum in forums {
        validate_forum_name(forum)?;
    }

    Ok(())
}

/// Validates a single forum name
fn validate_forum_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "Forum name cannot be empty".to_string(),
        ));
    }

    if name.chars().count() > MAX_FORUM_LEN {
        return Err(ConfigError::Validation(format!(
            "Forum name '{}' exceeds {} characters",
            name, MAX_FORUM_LEN
        )));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::Validation(format!(
            "Forum name '{}' must contain only ASCII letters, digits and underscores",
            name
        )));
    }

    Ok(())
}
