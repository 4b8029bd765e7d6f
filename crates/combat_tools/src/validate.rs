//! Data validation utilities.

use std::path::{Path, PathBuf};

use combat_core::data::DataStore;

use crate::error::{Result, ToolError};

/// Validation outcome for one data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// File checked.
    pub path: PathBuf,
    /// Entries per table.
    pub table_sizes: Vec<(&'static str, usize)>,
    /// Dangling references found.
    pub problems: Vec<String>,
}

impl FileReport {
    /// Whether the file has no problems.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Parse one data file and check its cross-table references.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub fn validate_file(path: &Path) -> Result<FileReport> {
    let text = std::fs::read_to_string(path).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let store = DataStore::from_ron_str(&path.display().to_string(), &text)?;
    let report = FileReport {
        path: path.to_path_buf(),
        table_sizes: store.table_sizes().to_vec(),
        problems: store.validate(),
    };
    tracing::debug!(
        path = %path.display(),
        problems = report.problems.len(),
        "data file checked"
    );
    Ok(report)
}

/// Validate a data file, or every `.ron` file in a directory.
///
/// Files are checked in name order.
///
/// # Errors
///
/// Returns an error if the directory cannot be read, holds no `.ron`
/// files, or a file fails to parse.
pub fn validate_data_directory(path: &Path) -> Result<Vec<FileReport>> {
    if path.is_file() {
        return Ok(vec![validate_file(path)?]);
    }

    let io_err = |source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path).map_err(io_err)? {
        let file = entry.map_err(io_err)?.path();
        if file.extension().is_some_and(|ext| ext == "ron") {
            files.push(file);
        }
    }
    if files.is_empty() {
        return Err(ToolError::NoDataFiles(path.to_path_buf()));
    }
    files.sort();

    files.iter().map(|file| validate_file(file)).collect()
}
