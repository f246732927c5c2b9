//! Core data types shared by the walker, the orchestrator and the exporters

use serde::Serialize;
use std::fmt;

/// Prefix written in front of the joined environment list in the export
pub const ENVIRONMENTS_PREFIX: &str = "environments: ";

/// Delimiter used to join environment names
pub const ENVIRONMENT_DELIMITER: &str = "-";

/// Repository name in `owner/name` form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RepositoryId(String);

impl RepositoryId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RepositoryId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RepositoryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Kind of a node in a repository tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
    /// Symlinks, submodules and anything else the walker does not follow
    Other,
}

/// One node of a repository file tree as returned by a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub kind: EntryKind,

    /// Final path component
    pub name: String,

    /// Slash-separated path relative to the repository root
    pub path: String,

    /// Opaque locator used to fetch the file body or the directory children
    pub fetch_ref: String,
}

impl TreeEntry {
    /// Returns true if this is a file whose name matches `candidate` ignoring case
    pub fn is_candidate(&self, candidate: &str) -> bool {
        self.kind == EntryKind::File && self.name.to_lowercase() == candidate.to_lowercase()
    }
}

/// Transport-encoded body of a file as returned by the content fetch call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileBody {
    pub content: Option<String>,
    pub encoding: Option<String>,
}

/// A candidate file after its body has been decoded to text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFile {
    pub path: String,
    pub text: String,
}

/// One line of the export: a managed file and its metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExportRow {
    pub repository: RepositoryId,
    pub file_path: String,
    pub flavor: String,

    /// Environment names already joined with [`ENVIRONMENT_DELIMITER`]
    pub environments: String,
}

impl ExportRow {
    /// Renders the environments column exactly as downstream consumers expect it
    pub fn environments_column(&self) -> String {
        format!("{}{}", ENVIRONMENTS_PREFIX, self.environments)
    }
}

/// What went wrong for a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Root listing failed; the repository contributed nothing
    RepositoryUnreachable,
    /// The per-repository deadline elapsed
    RepositoryTimeout,
    /// A subdirectory could not be listed
    DirectoryListing,
    /// The body of a candidate file could not be fetched
    Fetch,
    /// The body could not be decoded to text
    Decode,
    /// The decoded text is not a usable metadata document
    Parse,
}

impl DiagnosticKind {
    /// Returns true if the diagnostic concerns the repository as a whole
    pub fn is_repository_level(&self) -> bool {
        matches!(self, Self::RepositoryUnreachable | Self::RepositoryTimeout)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::RepositoryUnreachable => "repository_unreachable",
            Self::RepositoryTimeout => "repository_timeout",
            Self::DirectoryListing => "directory_listing",
            Self::Fetch => "fetch",
            Self::Decode => "decode",
            Self::Parse => "parse",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A recorded, non-fatal failure tied to a repository or one of its paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub repository: RepositoryId,
    pub path: Option<String>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn repository(
        repository: RepositoryId,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            path: None,
            kind,
            message: message.into(),
        }
    }

    pub fn file(
        repository: RepositoryId,
        path: impl Into<String>,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            path: Some(path.into()),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "[{}] {}:{}: {}", self.kind, self.repository, path, self.message),
            None => write!(f, "[{}] {}: {}", self.kind, self.repository, self.message),
        }
    }
}
