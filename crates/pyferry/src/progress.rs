//! Progress reporting types for registry operations.
//!
//! The lister, the mirror pipeline and the bulk deleter all report what they
//! are doing through a single event enum so the CLI can render either
//! progress bars or log lines.

/// Progress events emitted while working against a package registry.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum RegistryProgress {
    /// Starting to list packages for a project.
    FetchingPackages {
        /// Project being listed.
        project: String,
        /// Number of pages reported by `X-Total-Pages`.
        total_pages: u32,
    },

    /// Fetched a page of packages.
    FetchedPage {
        /// Page number (1-indexed).
        page: u32,
        /// Number of packages on this page.
        count: usize,
        /// Running total of packages fetched so far.
        total_so_far: usize,
        /// Total pages.
        total_pages: u32,
    },

    /// Finished listing packages.
    FetchComplete {
        project: String,
        total: usize,
    },

    /// Starting to mirror a single package.
    MirroringPackage {
        /// Package id in the source project.
        id: u64,
        name: String,
        version: String,
        /// 1-indexed position in the run.
        index: usize,
        /// Number of packages in the run.
        total: usize,
    },

    /// A distribution file was downloaded.
    Downloaded {
        filename: String,
        bytes: u64,
    },

    /// A file was already uploaded earlier in this run.
    SkippedDuplicate {
        filename: String,
    },

    /// A file was uploaded to the destination.
    Uploaded {
        filename: String,
    },

    /// A file failed to transfer. The run continues.
    TransferFailed {
        /// Filename, or the download URL when the name is not known yet.
        file: String,
        error: String,
    },

    /// Mirror run finished.
    MirrorComplete {
        packages: usize,
        uploaded: usize,
        skipped: usize,
        failed: usize,
    },

    /// Starting to delete packages.
    DeletingPackages {
        project: String,
        count: usize,
    },

    /// A package was deleted.
    Deleted {
        id: u64,
    },

    /// Failed to delete a package. The loop continues.
    DeleteFailed {
        id: u64,
        error: String,
    },

    /// Non-fatal warning.
    Warning {
        message: String,
    },
}

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(RegistryProgress) + Send + Sync>;

/// Helper to emit progress events if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: RegistryProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_emit_with_callback() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            sink.lock().unwrap().push(event);
        });

        emit(
            Some(&callback),
            RegistryProgress::Uploaded {
                filename: "pkg-1.0.tar.gz".to_string(),
            },
        );

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            RegistryProgress::Uploaded { filename } if filename == "pkg-1.0.tar.gz"
        ));
    }

    #[test]
    fn test_emit_without_callback() {
        emit(
            None,
            RegistryProgress::Warning {
                message: "ignored".to_string(),
            },
        );
    }
}
