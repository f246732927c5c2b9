//! Wire types for the GitHub contents and repositories endpoints

use crate::model::{EntryKind, FileBody, RepositoryId, TreeEntry};
use serde::Deserialize;

/// One element of a directory listing
#[derive(Debug, Clone, Deserialize)]
pub struct ContentItem {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

impl From<ContentItem> for TreeEntry {
    fn from(item: ContentItem) -> Self {
        let kind = match item.kind.as_str() {
            "file" => EntryKind::File,
            "dir" => EntryKind::Directory,
            _ => EntryKind::Other,
        };
        TreeEntry {
            kind,
            name: item.name,
            path: item.path,
            fetch_ref: item.url,
        }
    }
}

/// Body of a single-file contents response
#[derive(Debug, Clone, Deserialize)]
pub struct FileContentResponse {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl From<FileContentResponse> for FileBody {
    fn from(response: FileContentResponse) -> Self {
        FileBody {
            content: response.content,
            encoding: response.encoding,
        }
    }
}

/// One element of an organization repository listing
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryItem {
    pub full_name: String,
}

impl From<RepositoryItem> for RepositoryId {
    fn from(item: RepositoryItem) -> Self {
        RepositoryId::new(item.full_name)
    }
}
