use crate::config::types::{Config, HttpConfig, OutputConfig, SiteConfig, TierConfig};
use crate::url::is_allowed_host;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_user_agent(&config.user_agent.value)?;
    validate_http_config(&config.http)?;
    validate_tier("list", &config.tiers.list)?;
    validate_tier("detail", &config.tiers.detail)?;
    validate_tier("region", &config.tiers.region)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the harvested site: the root must live on the allowed host
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.allowed_host.is_empty() {
        return Err(ConfigError::Validation(
            "allowed_host cannot be empty".to_string(),
        ));
    }

    let root = Url::parse(&config.root_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root_url: {}", e)))?;

    if root.scheme() != "http" && root.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "root_url '{}' must use http or https",
            config.root_url
        )));
    }

    if !is_allowed_host(&root, &config.allowed_host) {
        return Err(ConfigError::Validation(format!(
            "root_url '{}' is not on allowed_host '{}'",
            config.root_url, config.allowed_host
        )));
    }

    Ok(())
}

fn validate_user_agent(value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user agent cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    Ok(())
}

/// Validates one tier's concurrency ceiling
fn validate_tier(name: &str, config: &TierConfig) -> Result<(), ConfigError> {
    if config.parallelism < 1 || config.parallelism > 100 {
        return Err(ConfigError::Validation(format!(
            "{} tier parallelism must be between 1 and 100, got {}",
            name, config.parallelism
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}
