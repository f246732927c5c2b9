use crate::config::types::{ApiConfig, Config, CrawlerConfig, OutputConfig, SourceConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_api_config(&config.api)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    if let Some(source) = &config.source {
        validate_source_config(source)?;
    }
    Ok(())
}

/// Validates API connection settings
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' has no host",
            config.base_url
        )));
    }

    if config.token_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "token-env cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.page_size < 1 || config.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "page-size must be between 1 and 100, got {}",
            config.page_size
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let name = config.candidate_filename.trim();
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "candidate-filename cannot be empty".to_string(),
        ));
    }

    if name.contains('/') {
        return Err(ConfigError::Validation(format!(
            "candidate-filename must be a plain file name, got '{}'",
            config.candidate_filename
        )));
    }

    if config.max_concurrent_repos < 1 || config.max_concurrent_repos > 64 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-repos must be between 1 and 64, got {}",
            config.max_concurrent_repos
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.backoff_base_ms > config.backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "backoff-base-ms ({}) cannot exceed backoff-max-ms ({})",
            config.backoff_base_ms, config.backoff_max_ms
        )));
    }

    if config.repo_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "repo-timeout-secs must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.csv_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "csv-path cannot be empty".to_string(),
        ));
    }

    if let Some(summary) = &config.summary_path {
        if summary.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "summary-path cannot be empty when set".to_string(),
            ));
        }
        if summary == &config.csv_path {
            return Err(ConfigError::Validation(
                "summary-path and csv-path must differ".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates the repository source selection
pub fn validate_source_config(source: &SourceConfig) -> Result<(), ConfigError> {
    match source {
        SourceConfig::List { path, column } => {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Validation(
                    "repo-list cannot be empty".to_string(),
                ));
            }
            if column.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "repo-column cannot be empty".to_string(),
                ));
            }
        }
        SourceConfig::Org { org } => validate_org_name(org)?,
    }
    Ok(())
}

/// Organization logins are alphanumeric with single inner hyphens
fn validate_org_name(org: &str) -> Result<(), ConfigError> {
    if org.is_empty() {
        return Err(ConfigError::Validation(
            "org cannot be empty".to_string(),
        ));
    }

    if !org
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ConfigError::Validation(format!(
            "org '{}' contains invalid characters",
            org
        )));
    }

    if org.starts_with('-') || org.ends_with('-') {
        return Err(ConfigError::Validation(format!(
            "org '{}' cannot start or end with '-'",
            org
        )));
    }

    Ok(())
}
