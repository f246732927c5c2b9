use crate::config::types::{Config, Credential, ResolvedConfig};
use crate::config::validation::{validate, validate_source_config};
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use bfile_scout::config::load_config;
///
/// let config = load_config(Path::new("scout.toml")).unwrap();
/// println!("Workers: {}", config.crawler.max_concurrent_repos);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is logged and written to the run report so two exports can be
/// traced back to the configuration that produced them.
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

/// Reads the access token from the process environment
pub fn resolve_credential(var: &str) -> Result<Credential, ConfigError> {
    resolve_credential_with(var, |name| std::env::var(name).ok())
}

/// Reads the access token through `lookup`; a missing or blank value is fatal
pub fn resolve_credential_with<F>(var: &str, lookup: F) -> Result<Credential, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(token) if !token.trim().is_empty() => Ok(Credential::new(token.trim())),
        _ => Err(ConfigError::MissingCredential {
            var: var.to_string(),
        }),
    }
}

/// Turns a loaded configuration into the fully-resolved value the crawler runs on
///
/// Validation runs again here because CLI overrides may have been applied
/// after the file was loaded.
pub fn resolve_config(
    mut config: Config,
    config_hash: Option<String>,
    credential: Credential,
) -> Result<ResolvedConfig, ConfigError> {
    config.crawler.candidate_filename = config.crawler.candidate_filename.trim().to_string();
    validate(&config)?;

    let source = config.source.clone().ok_or_else(|| {
        ConfigError::Validation(
            "no repository source configured; set [source] or pass --org / --repo-list"
                .to_string(),
        )
    })?;
    validate_source_config(&source)?;

    Ok(ResolvedConfig {
        config,
        credential,
        source,
        config_hash,
    })
}
