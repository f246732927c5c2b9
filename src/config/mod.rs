//! Configuration module for bfile-scout
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and resolving the access token from the environment before any network call.
//!
//! # Example
//!
//! ```no_run
//! use bfile_scout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scout.toml")).unwrap();
//! println!("Looking for files named {}", config.crawler.candidate_filename);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, Config, CrawlerConfig, Credential, OutputConfig, ResolvedConfig, SourceConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, resolve_config, resolve_credential,
    resolve_credential_with,
};
pub use validation::validate;
