//! JSON output for chart builders.
//!
//! Each rendered table is written to `<dir>/<name>.json` as a list of records,
//! and the cycle summary to `<dir>/_report.json`.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::application::use_cases::RenderOutput;

/// Table name reserved for the summary.
pub const REPORT_NAME: &str = "_report";

/// Name of the summary file.
pub const REPORT_FILE: &str = "_report.json";

/// Whether `name` can be written as `<dir>/<name>.json` without leaving
/// `dir` or replacing the summary.
#[must_use]
pub fn is_writable_table_name(name: &str) -> bool {
    !name.trim().is_empty() && name != REPORT_NAME && !name.contains(['/', '\\', '\0'])
}

/// Errors writing render output.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Filesystem failure.
    #[error("failed to write '{path}': {source}")]
    Io {
        /// File or directory being written.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },
    /// Table name that cannot be used as a file name.
    #[error("table name '{name}' cannot be written as an output file")]
    InvalidName {
        /// Offending table name.
        name: String,
    },
    /// Serialization failure.
    #[error("failed to serialize '{name}': {source}")]
    Serialize {
        /// Table or report name.
        name: String,
        /// The underlying serde error.
        source: serde_json::Error,
    },
}

/// Write every table and the summary, returning the written paths.
pub async fn write_render_output(
    dir: &Path,
    output: &RenderOutput,
) -> Result<Vec<PathBuf>, OutputError> {
    if let Some(name) = output.tables.keys().find(|n| !is_writable_table_name(n)) {
        return Err(OutputError::InvalidName { name: name.clone() });
    }

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| OutputError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut written = Vec::with_capacity(output.tables.len() + 1);
    for (name, table) in &output.tables {
        let bytes = serde_json::to_vec_pretty(&table.to_records()).map_err(|source| {
            OutputError::Serialize {
                name: name.clone(),
                source,
            }
        })?;
        written.push(write_file(&dir.join(format!("{name}.json")), &bytes).await?);
    }

    let report =
        serde_json::to_vec_pretty(&output.report()).map_err(|source| OutputError::Serialize {
            name: REPORT_FILE.to_string(),
            source,
        })?;
    written.push(write_file(&dir.join(REPORT_FILE), &report).await?);

    debug!(dir = %dir.display(), files = written.len(), "Wrote render output");
    Ok(written)
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<PathBuf, OutputError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(path.to_path_buf())
}
