//! In-memory [`RepositoryApi`] used by unit tests

use crate::api::{ApiUsage, RepositoryApi};
use crate::model::{EntryKind, FileBody, RepositoryId, TreeEntry};
use crate::{ApiError, ApiResult};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

type DirectoryKey = (String, String);

/// Repository trees held in memory
///
/// Adding a file registers every ancestor directory, so a tree is built by
/// listing its files only.
#[derive(Debug, Default)]
pub struct FakeApi {
    listings: HashMap<DirectoryKey, BTreeMap<String, TreeEntry>>,
    listing_failures: HashMap<DirectoryKey, u16>,
    bodies: HashMap<String, FileBody>,
    fetch_failures: HashMap<String, u16>,
    organizations: HashMap<String, Result<Vec<RepositoryId>, u16>>,
    delay: Option<Duration>,
    requests: AtomicU64,
}

pub fn encode(text: &str) -> String {
    general_purpose::STANDARD.encode(text)
}

fn fetch_ref(repository: &str, path: &str) -> String {
    format!("fake://{}/{}", repository, path)
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an empty repository
    pub fn with_repository(mut self, repository: &str) -> Self {
        self.listings
            .entry((repository.to_string(), String::new()))
            .or_default();
        self
    }

    /// Adds a base64-encoded file
    pub fn with_file(self, repository: &str, path: &str, text: &str) -> Self {
        self.with_body(
            repository,
            path,
            FileBody {
                content: Some(encode(text)),
                encoding: Some("base64".to_string()),
            },
        )
    }

    /// Adds a file with an arbitrary body
    pub fn with_body(mut self, repository: &str, path: &str, body: FileBody) -> Self {
        self.register(repository, path, EntryKind::File);
        self.bodies.insert(fetch_ref(repository, path), body);
        self
    }

    /// Adds a symlink entry that the walker must not follow
    pub fn with_symlink(mut self, repository: &str, path: &str) -> Self {
        self.register(repository, path, EntryKind::Other);
        self
    }

    /// Makes listing `path` fail with `status`; an empty path fails the root
    pub fn with_listing_failure(mut self, repository: &str, path: &str, status: u16) -> Self {
        if !path.is_empty() {
            self.register(repository, path, EntryKind::Directory);
        }
        self.listing_failures
            .insert((repository.to_string(), path.to_string()), status);
        self
    }

    /// Adds a file whose body fetch fails with `status`
    pub fn with_fetch_failure(mut self, repository: &str, path: &str, status: u16) -> Self {
        self.register(repository, path, EntryKind::File);
        self.fetch_failures
            .insert(fetch_ref(repository, path), status);
        self
    }

    pub fn with_organization(mut self, org: &str, repositories: &[&str]) -> Self {
        self.organizations.insert(
            org.to_string(),
            Ok(repositories.iter().map(|r| RepositoryId::from(*r)).collect()),
        );
        self
    }

    pub fn with_organization_failure(mut self, org: &str, status: u16) -> Self {
        self.organizations.insert(org.to_string(), Err(status));
        self
    }

    /// Delays every call by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    fn register(&mut self, repository: &str, path: &str, kind: EntryKind) {
        let repo = repository.to_string();
        self.listings.entry((repo.clone(), String::new())).or_default();

        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let mut parent = String::new();

        for (index, part) in parts.iter().enumerate() {
            let current = if parent.is_empty() {
                part.to_string()
            } else {
                format!("{}/{}", parent, part)
            };
            let is_last = index + 1 == parts.len();
            let entry_kind = if is_last { kind } else { EntryKind::Directory };

            self.listings
                .entry((repo.clone(), parent.clone()))
                .or_default()
                .insert(
                    part.to_string(),
                    TreeEntry {
                        kind: entry_kind,
                        name: part.to_string(),
                        path: current.clone(),
                        fetch_ref: fetch_ref(repository, &current),
                    },
                );

            if entry_kind == EntryKind::Directory {
                self.listings
                    .entry((repo.clone(), current.clone()))
                    .or_default();
            }
            parent = current;
        }
    }

    async fn call(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RepositoryApi for FakeApi {
    async fn list_directory(
        &self,
        repository: &RepositoryId,
        path: &str,
        reference: Option<&str>,
    ) -> ApiResult<Vec<TreeEntry>> {
        self.call().await;

        let key = (repository.to_string(), path.to_string());
        let url = reference
            .map(str::to_string)
            .unwrap_or_else(|| fetch_ref(repository.as_str(), path));

        if let Some(status) = self.listing_failures.get(&key) {
            return Err(ApiError::Http {
                url,
                status: *status,
            });
        }

        match self.listings.get(&key) {
            Some(entries) => Ok(entries.values().cloned().collect()),
            None => Err(ApiError::Http { url, status: 404 }),
        }
    }

    async fn fetch_file(&self, entry: &TreeEntry) -> ApiResult<FileBody> {
        self.call().await;

        if let Some(status) = self.fetch_failures.get(&entry.fetch_ref) {
            return Err(ApiError::Http {
                url: entry.fetch_ref.clone(),
                status: *status,
            });
        }

        self.bodies
            .get(&entry.fetch_ref)
            .cloned()
            .ok_or_else(|| ApiError::Http {
                url: entry.fetch_ref.clone(),
                status: 404,
            })
    }

    async fn list_organization_repositories(&self, org: &str) -> ApiResult<Vec<RepositoryId>> {
        self.call().await;

        match self.organizations.get(org) {
            Some(Ok(repositories)) => Ok(repositories.clone()),
            Some(Err(status)) => Err(ApiError::Http {
                url: format!("fake://orgs/{}", org),
                status: *status,
            }),
            None => Err(ApiError::Http {
                url: format!("fake://orgs/{}", org),
                status: 404,
            }),
        }
    }

    fn usage(&self) -> ApiUsage {
        ApiUsage {
            requests: self.requests(),
            rate_limit_hits: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registers_ancestors() {
        let api = FakeApi::new().with_file("org/app", "a/b/bfile", "managed: true");
        let repo = RepositoryId::from("org/app");

        let root = api.list_directory(&repo, "", None).await.unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].kind, EntryKind::Directory);
        assert_eq!(root[0].path, "a");

        let nested = api.list_directory(&repo, "a/b", None).await.unwrap();
        assert_eq!(nested[0].path, "a/b/bfile");
        assert_eq!(nested[0].kind, EntryKind::File);

        let body = api.fetch_file(&nested[0]).await.unwrap();
        assert_eq!(body.content, Some(encode("managed: true")));
        assert_eq!(api.requests(), 3);
    }
}
