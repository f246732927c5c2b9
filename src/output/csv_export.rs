//! CSV export of managed files
//!
//! Rows are written to a temporary file next to the destination, which is
//! renamed over the destination on [`ExportSink::finalize`]. An existing
//! export is left untouched by a run that fails or is dropped midway, and
//! its permissions carry over to the new file.

use crate::model::ExportRow;
use crate::output::traits::{ExportSink, OutputError, OutputResult};
use std::fs::{self, Permissions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Column headers of the export, in order
pub const EXPORT_HEADER: [&str; 4] = ["repo", "bfile_path", "flavor", "environments"];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// [`ExportSink`] writing a CSV file
pub struct CsvExport {
    destination: PathBuf,
    writer: csv::Writer<NamedTempFile>,
    permissions: Option<Permissions>,
    rows_written: u64,
}

impl CsvExport {
    /// Opens an export for `destination` and writes the header row
    ///
    /// Fails if the destination directory is not writable or the destination
    /// exists and is not a regular file. Nothing at `destination` changes
    /// until the export is finalized.
    pub fn create(destination: &Path, utf8_bom: bool) -> OutputResult<Self> {
        let permissions = match fs::metadata(destination) {
            Ok(metadata) if !metadata.is_file() => {
                return Err(OutputError::Write(format!(
                    "{} exists and is not a regular file",
                    destination.display()
                )));
            }
            Ok(metadata) => Some(metadata.permissions()),
            Err(_) => default_permissions(),
        };

        let directory = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut file = NamedTempFile::new_in(&directory).map_err(|e| {
            OutputError::Write(format!(
                "cannot create export in {}: {}",
                directory.display(),
                e
            ))
        })?;

        if utf8_bom {
            file.write_all(UTF8_BOM)?;
        }

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(EXPORT_HEADER)?;

        tracing::debug!("Opened export for {}", destination.display());

        Ok(Self {
            destination: destination.to_path_buf(),
            writer,
            permissions,
            rows_written: 0,
        })
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

impl ExportSink for CsvExport {
    fn write_row(&mut self, row: &ExportRow) -> OutputResult<()> {
        self.writer.write_record([
            row.repository.as_str(),
            row.file_path.as_str(),
            row.flavor.as_str(),
            row.environments_column().as_str(),
        ])?;
        self.rows_written += 1;
        Ok(())
    }

    fn rows_written(&self) -> u64 {
        self.rows_written
    }

    fn finalize(self) -> OutputResult<()> {
        let Self {
            destination,
            writer,
            permissions,
            rows_written,
        } = self;

        let file = writer
            .into_inner()
            .map_err(|e| OutputError::Write(e.to_string()))?;
        if let Some(permissions) = permissions {
            file.as_file().set_permissions(permissions)?;
        }
        file.as_file().sync_all()?;

        file.persist(&destination)
            .map_err(|e| OutputError::Persist {
                path: destination.display().to_string(),
                message: e.error.to_string(),
            })?;

        tracing::info!(
            "Wrote {} rows to {}",
            rows_written,
            destination.display()
        );
        Ok(())
    }
}

/// Mode of a freshly created export; temporary files start out owner-only
#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}

/// Writes `rows` to `destination` in one go
pub fn write_export(destination: &Path, rows: &[ExportRow], utf8_bom: bool) -> OutputResult<()> {
    let mut export = CsvExport::create(destination, utf8_bom)?;
    export.write_rows(rows)?;
    export.finalize()
}
