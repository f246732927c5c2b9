//! Repository tree walker
//!
//! The walker enumerates a repository depth-first from a start path, using an
//! explicit stack of pending directories rather than recursion. Candidate files
//! are fetched, decoded and parsed one at a time; every managed file yields a
//! row and every failure yields a diagnostic. Nothing short of cancellation
//! stops the walk early.

use crate::api::RepositoryApi;
use crate::crawler::decoder::decode_file;
use crate::crawler::parser::parse_metadata;
use crate::crawler::scheduler::CancelSignal;
use crate::model::{Diagnostic, DiagnosticKind, EntryKind, ExportRow, RepositoryId, TreeEntry};
use std::sync::Arc;

/// One item produced by the walker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkItem {
    Row(ExportRow),
    Diagnostic(Diagnostic),
}

/// Everything a finished walk produced
#[derive(Debug, Clone, Default)]
pub struct WalkOutcome {
    pub rows: Vec<ExportRow>,
    pub diagnostics: Vec<Diagnostic>,

    /// The start path could not be listed
    pub root_failed: bool,

    /// The walk stopped on cancellation with work left
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
struct PendingDirectory {
    path: String,
    reference: Option<String>,
}

/// Lazy depth-first walk over one repository
///
/// Call [`TreeWalker::next`] until it returns `None`.
pub struct TreeWalker {
    api: Arc<dyn RepositoryApi>,
    repository: RepositoryId,
    candidate: String,
    cancel: CancelSignal,
    directories: Vec<PendingDirectory>,
    files: Vec<TreeEntry>,
    root_path: String,
    root_failed: bool,
    cancelled: bool,
}

impl TreeWalker {
    /// Creates a walker starting at `start_path` (empty for the repository root)
    pub fn new(
        api: Arc<dyn RepositoryApi>,
        repository: RepositoryId,
        start_path: impl Into<String>,
        candidate_filename: &str,
        cancel: CancelSignal,
    ) -> Self {
        let root_path = start_path.into().trim_matches('/').to_string();
        Self {
            api,
            repository,
            candidate: candidate_filename.to_lowercase(),
            cancel,
            directories: vec![PendingDirectory {
                path: root_path.clone(),
                reference: None,
            }],
            files: Vec::new(),
            root_path,
            root_failed: false,
            cancelled: false,
        }
    }

    pub fn repository(&self) -> &RepositoryId {
        &self.repository
    }

    /// Returns true if listing the start path failed
    pub fn root_failed(&self) -> bool {
        self.root_failed
    }

    /// Returns true if the walk was stopped by cancellation
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Produces the next row or diagnostic, or `None` when the walk is over
    pub async fn next(&mut self) -> Option<WalkItem> {
        loop {
            if self.cancel.is_cancelled() {
                if !self.files.is_empty() || !self.directories.is_empty() {
                    tracing::debug!("Walk of {} cancelled", self.repository);
                    self.cancelled = true;
                    self.files.clear();
                    self.directories.clear();
                }
                return None;
            }

            if let Some(entry) = self.files.pop() {
                if let Some(item) = self.process_file(entry).await {
                    return Some(item);
                }
                continue;
            }

            if let Some(directory) = self.directories.pop() {
                if let Some(item) = self.list_directory(directory).await {
                    return Some(item);
                }
                continue;
            }

            return None;
        }
    }

    /// Drains the walker
    pub async fn collect(mut self) -> WalkOutcome {
        let mut outcome = WalkOutcome::default();
        while let Some(item) = self.next().await {
            match item {
                WalkItem::Row(row) => outcome.rows.push(row),
                WalkItem::Diagnostic(diagnostic) => outcome.diagnostics.push(diagnostic),
            }
        }
        outcome.root_failed = self.root_failed;
        outcome.cancelled = self.cancelled;
        outcome
    }

    /// Lists one directory and queues its candidate files and subdirectories
    async fn list_directory(&mut self, directory: PendingDirectory) -> Option<WalkItem> {
        let is_root = directory.reference.is_none() && directory.path == self.root_path;

        let entries = match self
            .api
            .list_directory(
                &self.repository,
                &directory.path,
                directory.reference.as_deref(),
            )
            .await
        {
            Ok(entries) => entries,
            Err(e) if is_root => {
                tracing::warn!("Could not list {}: {}", self.repository, e);
                self.root_failed = true;
                return Some(WalkItem::Diagnostic(Diagnostic::repository(
                    self.repository.clone(),
                    DiagnosticKind::RepositoryUnreachable,
                    format!("Root listing failed: {}", e),
                )));
            }
            Err(e) => {
                tracing::warn!(
                    "Could not list {}:{}: {}",
                    self.repository,
                    directory.path,
                    e
                );
                return Some(WalkItem::Diagnostic(Diagnostic::file(
                    self.repository.clone(),
                    directory.path,
                    DiagnosticKind::DirectoryListing,
                    e.to_string(),
                )));
            }
        };

        tracing::trace!(
            "{}:{} has {} entries",
            self.repository,
            directory.path,
            entries.len()
        );

        // Reversed so that popping follows listing order
        for entry in entries.into_iter().rev() {
            match entry.kind {
                EntryKind::File if entry.is_candidate(&self.candidate) => self.files.push(entry),
                EntryKind::Directory => self.directories.push(PendingDirectory {
                    path: entry.path,
                    reference: Some(entry.fetch_ref),
                }),
                _ => {}
            }
        }

        None
    }

    /// Fetches, decodes and parses one candidate file
    async fn process_file(&mut self, entry: TreeEntry) -> Option<WalkItem> {
        let body = match self.api.fetch_file(&entry).await {
            Ok(body) => body,
            Err(e) => {
                return Some(self.file_failure(entry.path, DiagnosticKind::Fetch, e.to_string()));
            }
        };

        let decoded = match decode_file(&entry.path, &body) {
            Ok(decoded) => decoded,
            Err(e) => {
                return Some(self.file_failure(entry.path, DiagnosticKind::Decode, e.to_string()));
            }
        };

        match parse_metadata(&decoded.text) {
            Ok(Some(record)) => {
                tracing::debug!("Managed file {}:{}", self.repository, decoded.path);
                Some(WalkItem::Row(
                    record.into_export_row(self.repository.clone(), decoded.path),
                ))
            }
            Ok(None) => {
                tracing::debug!("Skipping unmanaged {}:{}", self.repository, decoded.path);
                None
            }
            Err(e) => Some(self.file_failure(decoded.path, DiagnosticKind::Parse, e.to_string())),
        }
    }

    fn file_failure(&self, path: String, kind: DiagnosticKind, message: String) -> WalkItem {
        tracing::warn!("Failed to process {}:{}: {}", self.repository, path, message);
        WalkItem::Diagnostic(Diagnostic::file(
            self.repository.clone(),
            path,
            kind,
            message,
        ))
    }
}

/// Walks `repository` from `start_path` to completion
pub async fn walk(
    api: Arc<dyn RepositoryApi>,
    repository: RepositoryId,
    start_path: &str,
    candidate_filename: &str,
    cancel: CancelSignal,
) -> WalkOutcome {
    TreeWalker::new(api, repository, start_path, candidate_filename, cancel)
        .collect()
        .await
}
