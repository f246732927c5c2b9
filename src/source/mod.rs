//! Repository sources
//!
//! The set of repositories to scan comes from one of two places:
//! - A column of a CSV file ([`load_repository_list`])
//! - Every repository of an organization, listed through the API
//!   ([`list_organization`])
//!
//! Both produce the same sequence of [`RepositoryId`]s. Duplicates are
//! removed, keeping the first occurrence.

mod list;
mod org;

pub use list::load_repository_list;
pub use org::list_organization;

use crate::api::RepositoryApi;
use crate::config::SourceConfig;
use crate::model::RepositoryId;
use crate::SourceError;
use std::collections::HashSet;

/// Loads the repositories named by `source`
///
/// # Arguments
///
/// * `source` - Where the repositories come from
/// * `api` - Used only for organization listings
///
/// # Returns
///
/// * `Ok(Vec<RepositoryId>)` - Repositories in source order, without duplicates
/// * `Err(SourceError)` - The source could not be read
pub async fn load_repositories(
    source: &SourceConfig,
    api: &dyn RepositoryApi,
) -> Result<Vec<RepositoryId>, SourceError> {
    let repositories = match source {
        SourceConfig::List { path, column } => load_repository_list(path, column)?,
        SourceConfig::Org { org } => list_organization(api, org).await?,
    };

    let total = repositories.len();
    let repositories = dedup(repositories);
    if repositories.len() < total {
        tracing::info!(
            "Ignoring {} duplicate repository entries",
            total - repositories.len()
        );
    }

    Ok(repositories)
}

/// Describes a source for log lines
pub fn describe(source: &SourceConfig) -> String {
    match source {
        SourceConfig::List { path, column } => {
            format!("column '{}' of {}", column, path.display())
        }
        SourceConfig::Org { org } => format!("organization {}", org),
    }
}

fn dedup(repositories: Vec<RepositoryId>) -> Vec<RepositoryId> {
    let mut seen = HashSet::new();
    repositories
        .into_iter()
        .filter(|repository| seen.insert(repository.clone()))
        .collect()
}
