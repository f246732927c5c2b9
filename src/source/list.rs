//! Repository list read from a CSV file

use crate::model::RepositoryId;
use crate::SourceError;
use std::path::Path;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Reads repository identifiers from the `column` column of the CSV at `path`
///
/// Values are trimmed and blank cells are skipped. A leading byte order mark
/// is ignored. Row order is preserved.
pub fn load_repository_list(path: &Path, column: &str) -> Result<Vec<RepositoryId>, SourceError> {
    let content = std::fs::read(path).map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let bytes = content
        .strip_prefix(UTF8_BOM)
        .unwrap_or(content.as_slice());

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let index = reader
        .headers()?
        .iter()
        .position(|header| header == column)
        .ok_or_else(|| SourceError::MissingColumn {
            path: path.display().to_string(),
            column: column.to_string(),
        })?;

    let mut repositories = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        match record.get(index).map(str::trim) {
            Some(value) if !value.is_empty() => repositories.push(RepositoryId::from(value)),
            _ => tracing::debug!(
                "Skipping row {} of {} without a repository",
                line + 2,
                path.display()
            ),
        }
    }

    tracing::debug!(
        "Read {} repositories from {}",
        repositories.len(),
        path.display()
    );

    Ok(repositories)
}
