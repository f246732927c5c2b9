use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for bfile-scout
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub source: Option<SourceConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Hosting API connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base endpoint, e.g. `https://api.github.com` or `https://ghe.example.com/api/v3`
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Name of the environment variable holding the access token
    #[serde(rename = "token-env", default = "default_token_env")]
    pub token_env: String,

    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Page size for organization repository listings
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_env: default_token_env(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
            page_size: default_page_size(),
        }
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// File name that marks a candidate file (compared case-insensitively)
    #[serde(rename = "candidate-filename", default = "default_candidate_filename")]
    pub candidate_filename: String,

    /// Number of repositories walked in parallel
    #[serde(rename = "max-concurrent-repos", default = "default_max_concurrent_repos")]
    pub max_concurrent_repos: u32,

    /// Retries for rate-limited, 5xx or timed out calls
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(rename = "backoff-max-ms", default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Upper bound on the wall time spent walking one repository
    #[serde(rename = "repo-timeout-secs", default)]
    pub repo_timeout_secs: Option<u64>,
}

impl CrawlerConfig {
    pub fn repo_timeout(&self) -> Option<Duration> {
        self.repo_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            candidate_filename: default_candidate_filename(),
            max_concurrent_repos: default_max_concurrent_repos(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            repo_timeout_secs: None,
        }
    }
}

/// Where the repositories to scan come from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum SourceConfig {
    /// Repositories read from a column of a CSV file
    List {
        #[serde(rename = "repo-list")]
        path: PathBuf,
        #[serde(rename = "repo-column", default = "default_repo_column")]
        column: String,
    },

    /// Every repository of an organization
    Org { org: String },
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the CSV export
    #[serde(rename = "csv-path", default = "default_csv_path")]
    pub csv_path: PathBuf,

    /// Prefix the export with a UTF-8 byte order mark
    #[serde(rename = "utf8-bom", default = "default_true")]
    pub utf8_bom: bool,

    /// Path of the markdown run report
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            utf8_bom: true,
            summary_path: None,
        }
    }
}

/// Access token read from the environment
///
/// The token is zeroized on drop and only readable through [`ExposeSecret`].
pub struct Credential(SecretString);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }
}

impl ExposeSecret<str> for Credential {
    fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for Credential {
    fn clone(&self) -> Self {
        Self::new(self.expose_secret())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Configuration with every interactive input already resolved
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: Config,
    pub credential: Credential,
    pub source: SourceConfig,

    /// Hash of the configuration file, when one was loaded
    pub config_hash: Option<String>,
}

fn default_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("bfile-scout/{}", env!("CARGO_PKG_VERSION"))
}

fn default_page_size() -> u32 {
    100
}

fn default_candidate_filename() -> String {
    "bfile".to_string()
}

fn default_max_concurrent_repos() -> u32 {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_backoff_max_ms() -> u64 {
    60_000
}

fn default_repo_column() -> String {
    "repo".to_string()
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("bfiles_fetched.csv")
}

fn default_true() -> bool {
    true
}
