use pyferry::RegistryProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: RegistryProgress) {
        match event {
            RegistryProgress::FetchingPackages {
                project,
                total_pages,
            } => {
                tracing::info!(project = %project, total_pages, "Fetching packages");
            }

            RegistryProgress::FetchedPage {
                page,
                count,
                total_so_far,
                total_pages,
            } => {
                tracing::debug!(page, count, total_so_far, total_pages, "Fetched page");
            }

            RegistryProgress::FetchComplete { project, total } => {
                tracing::info!(project = %project, total, "Fetch complete");
            }

            RegistryProgress::MirroringPackage {
                id,
                name,
                version,
                index,
                total,
            } => {
                tracing::info!(id, package = %format!("{}=={}", name, version), index, total, "Mirroring package");
            }

            RegistryProgress::Downloaded { filename, bytes } => {
                tracing::debug!(filename = %filename, bytes, "Downloaded");
            }

            RegistryProgress::SkippedDuplicate { filename } => {
                tracing::info!(filename = %filename, "Already uploaded, skipping");
            }

            RegistryProgress::Uploaded { filename } => {
                tracing::info!(filename = %filename, "Uploaded");
            }

            RegistryProgress::TransferFailed { file, error } => {
                tracing::warn!(file = %file, error = %error, "Failed to transfer");
            }

            RegistryProgress::MirrorComplete {
                packages,
                uploaded,
                skipped,
                failed,
            } => {
                tracing::info!(packages, uploaded, skipped, failed, "Mirror complete");
            }

            RegistryProgress::DeletingPackages { project, count } => {
                tracing::info!(project = %project, count, "Deleting packages");
            }

            RegistryProgress::Deleted { id } => {
                tracing::info!(id, "Deleted package");
            }

            RegistryProgress::DeleteFailed { id, error } => {
                tracing::warn!(id, error = %error, "Failed to delete package");
            }

            RegistryProgress::Warning { message } => {
                tracing::warn!(message = %message, "Warning");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
