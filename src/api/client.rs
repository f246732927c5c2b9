//! HTTP client for the GitHub REST API
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with user agent, timeouts and auth headers
//! - Directory listings and file fetches through the contents API
//! - Paginated organization repository listings
//! - Retry with backoff and a run-wide rate limit window

use crate::api::retry::RetryPolicy;
use crate::api::types::{ContentItem, FileContentResponse, RepositoryItem};
use crate::api::{ApiUsage, RepositoryApi};
use crate::config::{ApiConfig, CrawlerConfig, Credential};
use crate::model::{FileBody, RepositoryId, TreeEntry};
use crate::state::RateLimitState;
use crate::{ApiError, ApiResult, ConfigError, ScoutError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// The credential goes into a default `Authorization: Bearer` header marked
/// sensitive so it never shows up in debug output.
///
/// # Example
///
/// ```no_run
/// use bfile_scout::api::build_http_client;
/// use bfile_scout::config::{ApiConfig, Credential};
///
/// let client = build_http_client(&ApiConfig::default(), &Credential::new("ghp_example")).unwrap();
/// ```
pub fn build_http_client(config: &ApiConfig, credential: &Credential) -> Result<Client, ScoutError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/vnd.github+json"),
    );

    let mut auth = HeaderValue::from_str(&format!("Bearer {}", credential.expose_secret()))
        .map_err(|_| {
            ConfigError::Validation("access token contains invalid header characters".to_string())
        })?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);

    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// [`RepositoryApi`] implementation backed by the GitHub REST API
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_url: Url,
    page_size: u32,
    retry: RetryPolicy,
    rate_limit: Arc<Mutex<RateLimitState>>,
}

impl GitHubClient {
    /// Creates a client for the configured base endpoint
    pub fn new(
        api: &ApiConfig,
        crawler: &CrawlerConfig,
        credential: &Credential,
    ) -> Result<Self, ScoutError> {
        let http = build_http_client(api, credential)?;
        let base_url = Url::parse(&api.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            page_size: api.page_size,
            retry: RetryPolicy::from_config(crawler),
            rate_limit: Arc::new(Mutex::new(RateLimitState::new())),
        })
    }

    /// Builds `{base}/{segments...}`, percent-encoding each path piece
    pub fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut parts = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?;
            parts.pop_if_empty();
            for segment in segments {
                for piece in segment.split('/').filter(|p| !p.is_empty()) {
                    parts.push(piece);
                }
            }
        }
        Ok(url)
    }

    fn rate_limit(&self) -> MutexGuard<'_, RateLimitState> {
        self.rate_limit
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sleeps until the shared rate limit window has passed
    async fn wait_for_rate_limit(&self) {
        loop {
            let wait = {
                let mut state = self.rate_limit();
                let now = Instant::now();
                state.clear_if_elapsed(now);
                state.time_until_next_request(now)
            };
            match wait {
                Some(duration) => {
                    tracing::debug!("Rate limited, pausing requests for {:?}", duration);
                    tokio::time::sleep(duration).await;
                }
                None => break,
            }
        }
    }

    /// Sends a GET request, retrying rate-limited, 5xx and timed out attempts
    async fn get(&self, url: &str) -> ApiResult<Response> {
        let mut attempt = 0u32;

        loop {
            self.wait_for_rate_limit().await;
            self.rate_limit().record_request();

            match self.http.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    if !RetryPolicy::is_retryable_status(status) {
                        return Err(ApiError::Http {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }

                    let rate_limited = RetryPolicy::is_rate_limited(status, response.headers());
                    if attempt >= self.retry.max_retries {
                        return Err(if rate_limited {
                            ApiError::RateLimited {
                                url: url.to_string(),
                                status: status.as_u16(),
                                attempts: attempt + 1,
                            }
                        } else {
                            ApiError::Http {
                                url: url.to_string(),
                                status: status.as_u16(),
                            }
                        });
                    }

                    let delay = self.retry.delay_for_response(
                        attempt,
                        response.headers(),
                        chrono::Utc::now().timestamp(),
                    );
                    tracing::warn!(
                        "HTTP {} from {}, retry {}/{} in {:?}",
                        status.as_u16(),
                        url,
                        attempt + 1,
                        self.retry.max_retries,
                        delay
                    );

                    if rate_limited {
                        // Every worker waits out the window before its next call
                        self.rate_limit().mark_rate_limited(Instant::now(), delay);
                    } else {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) if e.is_timeout() => {
                    if attempt >= self.retry.max_retries {
                        return Err(ApiError::Timeout {
                            url: url.to_string(),
                        });
                    }
                    let delay = self.retry.backoff(attempt);
                    tracing::warn!(
                        "Request timeout for {}, retry {}/{} in {:?}",
                        url,
                        attempt + 1,
                        self.retry.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(ApiError::Transport {
                        url: url.to_string(),
                        source: e,
                    });
                }
            }

            attempt += 1;
        }
    }

    /// Sends a GET request and decodes the JSON body
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let response = self.get(url).await?;
        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout {
                    url: url.to_string(),
                }
            } else {
                ApiError::InvalidResponse {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }
}

#[async_trait]
impl RepositoryApi for GitHubClient {
    async fn list_directory(
        &self,
        repository: &RepositoryId,
        path: &str,
        reference: Option<&str>,
    ) -> ApiResult<Vec<TreeEntry>> {
        let url = match reference {
            Some(reference) => reference.to_string(),
            None => self
                .endpoint(&["repos", repository.as_str(), "contents", path])?
                .to_string(),
        };

        tracing::trace!("Listing {}:{} via {}", repository, path, url);
        let items: Vec<ContentItem> = self.get_json(&url).await?;
        Ok(items.into_iter().map(TreeEntry::from).collect())
    }

    async fn fetch_file(&self, entry: &TreeEntry) -> ApiResult<FileBody> {
        tracing::trace!("Fetching {}", entry.fetch_ref);
        let response: FileContentResponse = self.get_json(&entry.fetch_ref).await?;
        Ok(response.into())
    }

    async fn list_organization_repositories(&self, org: &str) -> ApiResult<Vec<RepositoryId>> {
        let mut repositories = Vec::new();
        let mut page = 1u32;

        loop {
            let mut url = self.endpoint(&["orgs", org, "repos"])?;
            url.query_pairs_mut()
                .append_pair("per_page", &self.page_size.to_string())
                .append_pair("page", &page.to_string());

            let items: Vec<RepositoryItem> = self.get_json(url.as_str()).await?;
            let count = items.len();
            repositories.extend(items.into_iter().map(RepositoryId::from));

            tracing::debug!(
                "Organization {} page {}: {} repositories",
                org,
                page,
                count
            );

            if count < self.page_size as usize {
                break;
            }
            page += 1;
        }

        Ok(repositories)
    }

    fn usage(&self) -> ApiUsage {
        let state = self.rate_limit();
        ApiUsage {
            requests: state.request_count,
            rate_limit_hits: state.rate_limit_hits,
        }
    }
}
