//! Package mirror pipeline.
//!
//! Copies every distribution file of every package in a source project to a
//! destination project, strictly one file at a time:
//!
//! 1. List package ids in the source project
//! 2. Fetch each package's info and its simple index page
//! 3. Stream every linked file into a private working directory
//! 4. Upload files whose name was not already uploaded in this run, then
//!    delete them
//!
//! Per-file and per-package failures are collected in the [`MirrorReport`]
//! and never stop the run. Only failing to list the source project is fatal.

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

use crate::gitlab::{GitLabClient, GitLabError};
use crate::progress::{ProgressCallback, RegistryProgress, emit};
use crate::simple_index::{extract_hrefs, resolve_file_urls};
use crate::upload::{PackageUploader, UploadTarget};

/// Fatal mirror errors.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Failed to list source packages: {0}")]
    Listing(#[from] GitLabError),

    #[error("Failed to create working directory: {0}")]
    WorkDir(#[source] std::io::Error),
}

/// What a mirror run copies and where.
#[derive(Debug, Clone)]
pub struct MirrorRequest {
    pub source_project: String,
    pub destination_project: String,
    pub target: UploadTarget,
}

impl MirrorRequest {
    /// Mirror within the client's GitLab instance, uploading as `username`
    /// with the client's token.
    pub fn new(
        client: &GitLabClient,
        source_project: impl Into<String>,
        destination_project: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        let destination_project = destination_project.into();
        let target = UploadTarget {
            url: client.pypi_upload_url(&destination_project),
            username: username.into(),
            token: client.token().to_string(),
        };
        Self {
            source_project: source_project.into(),
            destination_project,
            target,
        }
    }
}

/// Step at which a transfer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    PackageInfo,
    Index,
    Download,
    Upload,
}

impl TransferStage {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferStage::PackageInfo => "package info",
            TransferStage::Index => "simple index",
            TransferStage::Download => "download",
            TransferStage::Upload => "upload",
        }
    }
}

/// A non-fatal failure recorded during a mirror run.
#[derive(Debug, Clone)]
pub struct TransferFailure {
    /// Source package id.
    pub package_id: u64,
    /// Filename, or the URL/package name when no filename is known.
    pub file: String,
    pub stage: TransferStage,
    pub error: String,
}

/// Outcome of a mirror run.
#[derive(Debug, Default)]
pub struct MirrorReport {
    /// Number of package ids processed.
    pub packages: usize,
    /// Number of files downloaded, duplicates included.
    pub downloaded: usize,
    /// Number of files uploaded.
    pub uploaded: usize,
    /// Number of files skipped because the filename was already uploaded.
    pub skipped: usize,
    /// Failures encountered (non-fatal).
    pub failures: Vec<TransferFailure>,
}

impl MirrorReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    fn record(
        &mut self,
        on_progress: Option<&ProgressCallback>,
        package_id: u64,
        file: impl Into<String>,
        stage: TransferStage,
        error: impl ToString,
    ) {
        let failure = TransferFailure {
            package_id,
            file: file.into(),
            stage,
            error: error.to_string(),
        };

        tracing::warn!(
            package_id,
            file = %failure.file,
            stage = stage.as_str(),
            error = %failure.error,
            "Transfer failed"
        );
        emit(
            on_progress,
            RegistryProgress::TransferFailed {
                file: failure.file.clone(),
                error: failure.error.clone(),
            },
        );

        self.failures.push(failure);
    }
}

/// Mirror every package from the source project to the destination.
pub async fn mirror_packages(
    client: &GitLabClient,
    uploader: &dyn PackageUploader,
    request: &MirrorRequest,
    on_progress: Option<&ProgressCallback>,
) -> Result<MirrorReport, MirrorError> {
    let workdir = tempfile::Builder::new()
        .prefix("pyferry-")
        .tempdir()
        .map_err(MirrorError::WorkDir)?;

    let source = request.source_project.as_str();
    let ids = client.list_package_ids(source, on_progress).await?;

    tracing::info!(
        source,
        destination = %request.destination_project,
        packages = ids.len(),
        "Mirroring packages"
    );

    let mut uploaded_files: HashSet<String> = HashSet::new();
    let mut report = MirrorReport::default();

    for (index, &id) in ids.iter().enumerate() {
        report.packages += 1;

        let package = match client.get_package(source, id).await {
            Ok(package) => package,
            Err(e) => {
                report.record(on_progress, id, id.to_string(), TransferStage::PackageInfo, e);
                continue;
            }
        };

        emit(
            on_progress,
            RegistryProgress::MirroringPackage {
                id,
                name: package.name.clone(),
                version: package.version.clone(),
                index: index + 1,
                total: ids.len(),
            },
        );

        let urls = match client.get_simple_index(source, &package.name).await {
            Ok((index_url, html)) => resolve_file_urls(&index_url, &extract_hrefs(&html)),
            Err(e) => {
                report.record(on_progress, id, package.name.clone(), TransferStage::Index, e);
                continue;
            }
        };

        for url in urls {
            let file = match client.download_file(&url, workdir.path()).await {
                Ok(file) => file,
                Err(e) => {
                    report.record(on_progress, id, url, TransferStage::Download, e);
                    continue;
                }
            };

            report.downloaded += 1;
            emit(
                on_progress,
                RegistryProgress::Downloaded {
                    filename: file.filename.clone(),
                    bytes: file.size,
                },
            );

            if !uploaded_files.insert(file.filename.clone()) {
                tracing::debug!(filename = %file.filename, "Already uploaded in this run, skipping");
                report.skipped += 1;
                discard(&file.path, on_progress).await;
                emit(
                    on_progress,
                    RegistryProgress::SkippedDuplicate {
                        filename: file.filename,
                    },
                );
                continue;
            }

            let filename = file.filename.clone();
            let result = uploader.upload(&request.target, &file.path, &package).await;
            discard(&file.path, on_progress).await;
            match result {
                Ok(()) => {
                    report.uploaded += 1;
                    emit(on_progress, RegistryProgress::Uploaded { filename });
                }
                Err(e) => report.record(on_progress, id, filename, TransferStage::Upload, e),
            }
        }
    }

    emit(
        on_progress,
        RegistryProgress::MirrorComplete {
            packages: report.packages,
            uploaded: report.uploaded,
            skipped: report.skipped,
            failed: report.failed(),
        },
    );

    Ok(report)
}

/// Remove a downloaded file, warning if it cannot be removed.
async fn discard(path: &Path, on_progress: Option<&ProgressCallback>) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove temporary file");
        emit(
            on_progress,
            RegistryProgress::Warning {
                message: format!("Failed to remove {}: {e}", path.display()),
            },
        );
    }
}
