//! CSV inventory of the packages in a project.
//!
//! One `name,version` row per package id, in listing order, without a header
//! row. Duplicate (name, version) pairs are written as many times as they
//! occur.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use thiserror::Error;

use crate::gitlab::{GitLabClient, GitLabError};
use crate::progress::ProgressCallback;

/// Default output file name.
pub const DEFAULT_CSV_PATH: &str = "get-uniq-pypi-package-name-and-version.csv";

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(transparent)]
    GitLab(#[from] GitLabError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Write the inventory of `project` to `writer`.
///
/// Returns the number of rows written.
pub async fn write_inventory<W: Write>(
    client: &GitLabClient,
    project: &str,
    writer: W,
    on_progress: Option<&ProgressCallback>,
) -> Result<usize, InventoryError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);

    let ids = client.list_package_ids(project, on_progress).await?;

    let mut rows = 0;
    for id in ids {
        let package = client.get_package(project, id).await?;
        tracing::debug!(id, name = %package.name, version = %package.version, "Inventory row");
        csv_writer.write_record([package.name.as_str(), package.version.as_str()])?;
        rows += 1;
    }

    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(rows)
}

/// Truncate or create `path` and write the inventory of `project` into it.
pub async fn export_inventory(
    client: &GitLabClient,
    project: &str,
    path: &Path,
    on_progress: Option<&ProgressCallback>,
) -> Result<usize, InventoryError> {
    let file = File::create(path).map_err(|source| InventoryError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let rows = write_inventory(client, project, file, on_progress).await?;
    tracing::info!(project, rows, path = %path.display(), "Wrote package inventory");
    Ok(rows)
}
