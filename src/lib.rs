//! bfile-scout: managed bfile discovery across GitHub repositories
//!
//! This crate walks the file trees of a set of repositories through the GitHub
//! contents API, picks out files named `bfile`, reads the YAML metadata embedded
//! in them and exports one CSV row per managed file.

pub mod api;
pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod source;
pub mod state;

#[cfg(test)]
pub(crate) mod test_utils;

use thiserror::Error;

/// Main error type for bfile-scout operations
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Repository source error: {0}")]
    Source(#[from] SourceError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Environment variable {var} is not set; export a GitHub token before running")]
    MissingCredential { var: String },
}

/// Errors raised while assembling the list of repositories to scan
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read repository list {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse repository list: {0}")]
    Csv(#[from] csv::Error),

    #[error("Repository list {path} has no '{column}' column")]
    MissingColumn { path: String, column: String },

    #[error("Listing repositories for organization {org} returned HTTP {status}")]
    OrgListing { org: String, status: u16 },

    #[error("Listing repositories failed: {0}")]
    Api(ApiError),
}

/// Errors from calls against the hosting API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Rate limited by {url} (HTTP {status}) after {attempts} attempts")]
    RateLimited {
        url: String,
        status: u16,
        attempts: u32,
    },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Unexpected response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status carried by the error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::RateLimited { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors turning a transport-encoded file body into text
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("File body has no content")]
    MissingContent,

    #[error("Unsupported content encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("Invalid base64 content: {0}")]
    InvalidBase64(String),

    #[error("Decoded content is not valid UTF-8")]
    InvalidUtf8,
}

/// Errors parsing the metadata document of a candidate file
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Document is not a mapping")]
    NotAMapping,

    #[error("Invalid environment value: {0}")]
    InvalidEnvironment(String),
}

/// Result type alias for bfile-scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for API calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;

// Re-export commonly used types
pub use config::{Config, ResolvedConfig};
pub use model::{Diagnostic, DiagnosticKind, ExportRow, RepositoryId, TreeEntry};
pub use state::RepoState;
