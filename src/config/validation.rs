use crate::client::extract_user_agent;
use crate::config::types::{CacheConfig, ClientConfig, RetryConfig};
use crate::url::is_valid_domain;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &ClientConfig) -> Result<(), ConfigError> {
    validate_netloc(config.netloc.as_deref())?;
    validate_headers(config)?;
    validate_cache_config(&config.cache)?;
    validate_retry_config(&config.retry)?;
    Ok(())
}

fn validate_netloc(netloc: Option<&str>) -> Result<(), ConfigError> {
    match netloc {
        Some(netloc) if !is_valid_domain(netloc) => Err(ConfigError::Validation(format!(
            "netloc must be a bare domain name, got '{}'",
            netloc
        ))),
        _ => Ok(()),
    }
}

/// Headers must be valid and carry a non-blank User-Agent
fn validate_headers(config: &ClientConfig) -> Result<(), ConfigError> {
    let headers = config.header_map()?;
    extract_user_agent(&headers)?;
    Ok(())
}

fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.enabled && config.dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "cache dir cannot be empty when caching is enabled".to_string(),
        ));
    }
    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.backoff_step < 1 {
        return Err(ConfigError::Validation(format!(
            "backoff-step must be >= 1, got {}",
            config.backoff_step
        )));
    }
    Ok(())
}
