//! Repositories of an organization

use crate::api::RepositoryApi;
use crate::model::RepositoryId;
use crate::{ApiError, SourceError};

/// Lists every repository of `org`
///
/// A non-success answer from the server becomes [`SourceError::OrgListing`]
/// so callers can tell it apart from transport failures.
pub async fn list_organization(
    api: &dyn RepositoryApi,
    org: &str,
) -> Result<Vec<RepositoryId>, SourceError> {
    tracing::info!("Listing repositories of organization {}", org);

    match api.list_organization_repositories(org).await {
        Ok(repositories) => {
            tracing::info!("Organization {} has {} repositories", org, repositories.len());
            Ok(repositories)
        }
        Err(ApiError::Http { status, .. }) | Err(ApiError::RateLimited { status, .. }) => {
            Err(SourceError::OrgListing {
                org: org.to_string(),
                status,
            })
        }
        Err(e) => Err(SourceError::Api(e)),
    }
}
