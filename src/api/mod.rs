//! Hosting API access
//!
//! This module contains everything that talks to the version-control API:
//! - The [`RepositoryApi`] seam the crawler is written against
//! - The reqwest-backed [`GitHubClient`] implementation
//! - Retry and backoff policy for rate-limited and transient failures

mod client;
mod retry;
mod types;

pub use client::{build_http_client, GitHubClient};
pub use retry::RetryPolicy;
pub use types::{ContentItem, FileContentResponse, RepositoryItem};

use crate::model::{FileBody, RepositoryId, TreeEntry};
use crate::ApiResult;
use async_trait::async_trait;

/// Request counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApiUsage {
    pub requests: u64,
    pub rate_limit_hits: u64,
}

/// Calls the crawler needs from the hosting API
///
/// Implementations must be safe to share between workers.
#[async_trait]
pub trait RepositoryApi: Send + Sync {
    /// Lists the entries of one directory
    ///
    /// `reference` is the fetch reference of the directory entry when the
    /// directory was discovered through a parent listing; the repository root
    /// is listed by `path` alone.
    async fn list_directory(
        &self,
        repository: &RepositoryId,
        path: &str,
        reference: Option<&str>,
    ) -> ApiResult<Vec<TreeEntry>>;

    /// Fetches the transport-encoded body of a file entry
    async fn fetch_file(&self, entry: &TreeEntry) -> ApiResult<FileBody>;

    /// Lists every repository of an organization, following pagination
    async fn list_organization_repositories(&self, org: &str) -> ApiResult<Vec<RepositoryId>>;

    /// Request counters so far
    fn usage(&self) -> ApiUsage {
        ApiUsage::default()
    }
}
