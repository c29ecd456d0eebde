//! GitLab package registry client.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;

use super::error::GitLabError;
use super::types::{Credential, Package, RegistryEndpoint};
use crate::http::reqwest_transport::{DEFAULT_TIMEOUT, ReqwestTransport};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::progress::{ProgressCallback, RegistryProgress, emit};
use crate::simple_index::content_disposition_filename;

/// Page size for package listing. GitLab caps `per_page` at 100.
pub const PAGE_SIZE: u32 = 100;

/// Header GitLab uses to report the number of pages.
pub const TOTAL_PAGES_HEADER: &str = "X-Total-Pages";

/// Timeout for a whole distribution download. Wheels and sdists can be far
/// larger than any API response.
pub const DOWNLOAD_TIMEOUT: StdDuration = StdDuration::from_secs(300);

/// A file fetched from the registry and written to disk.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    /// Filename from `Content-Disposition`.
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
}

/// GitLab package registry client.
///
/// Access tokens are sent as `PRIVATE-TOKEN`, OAuth tokens as
/// `Authorization: Bearer` (see [`Credential::auth_header`]).
#[derive(Clone)]
pub struct GitLabClient {
    transport: Arc<dyn HttpTransport>,
    download_transport: Arc<dyn HttpTransport>,
    host: String,
    credential: Credential,
}

impl GitLabClient {
    /// Create a new GitLab client with the default request timeout.
    ///
    /// # Arguments
    ///
    /// * `host` - GitLab host (e.g., "gitlab.com" or "https://gitlab.example.com")
    /// * `credential` - Access token or OAuth credential
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = GitLabClient::new("https://gitlab.example.com", "glpat-...")?;
    /// let ids = client.list_package_ids("group/project", None).await?;
    /// ```
    pub fn new(host: &str, credential: impl Into<Credential>) -> Result<Self, GitLabError> {
        Self::with_timeout(host, credential, DEFAULT_TIMEOUT)
    }

    /// Create a new GitLab client with a custom API request timeout.
    ///
    /// Downloads use [`DOWNLOAD_TIMEOUT`] instead.
    pub fn with_timeout(
        host: &str,
        credential: impl Into<Credential>,
        timeout: StdDuration,
    ) -> Result<Self, GitLabError> {
        let transport = ReqwestTransport::with_timeout(timeout)?;
        let download_transport = ReqwestTransport::with_timeout(DOWNLOAD_TIMEOUT)?;
        Ok(Self {
            transport: Arc::new(transport),
            download_transport: Arc::new(download_transport),
            host: crate::oauth::normalize_host(host),
            credential: credential.into(),
        })
    }

    pub fn new_with_transport(
        host: &str,
        credential: impl Into<Credential>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            download_transport: transport.clone(),
            transport,
            host: crate::oauth::normalize_host(host),
            credential: credential.into(),
        }
    }

    /// Get the host URL.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn token(&self) -> &str {
        self.credential.token()
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// The registry endpoint for `project` on this client's host.
    pub fn endpoint(&self, project: &str) -> RegistryEndpoint {
        RegistryEndpoint::new(&self.host, project)
    }

    fn packages_url(&self, project: &str) -> String {
        format!("{}/packages", self.endpoint(project).project_api_url())
    }

    /// URL of the PEP 503 simple index page for a package.
    pub fn simple_index_url(&self, project: &str, name: &str) -> String {
        format!(
            "{}/packages/pypi/simple/{}",
            self.endpoint(project).project_api_url(),
            name
        )
    }

    /// Legacy PyPI upload endpoint for a project.
    pub fn pypi_upload_url(&self, project: &str) -> String {
        self.endpoint(project).pypi_upload_url()
    }

    fn request(&self, method: HttpMethod, url: String) -> HttpRequest {
        let (name, value) = self.credential.auth_header();
        HttpRequest::new(method, url).header(name, value)
    }

    /// Make an authenticated request and fail on non-2xx statuses.
    async fn send(&self, method: HttpMethod, url: String) -> Result<HttpResponse, GitLabError> {
        let response = self.transport.send(self.request(method, url)).await?;

        if !response.is_success() {
            return Err(GitLabError::from_status(response.status, &response.text()));
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, GitLabError> {
        let response = self.send(HttpMethod::Get, url).await?;
        serde_json::from_slice(&response.body).map_err(GitLabError::Json)
    }

    /// Read the number of package pages from `X-Total-Pages`.
    pub async fn total_pages(&self, project: &str) -> Result<u32, GitLabError> {
        let url = format!("{}?per_page={}", self.packages_url(project), PAGE_SIZE);
        let response = self.send(HttpMethod::Get, url.clone()).await?;

        let value = response
            .header(TOTAL_PAGES_HEADER)
            .ok_or(GitLabError::MissingHeader {
                header: TOTAL_PAGES_HEADER,
                url,
            })?;

        value
            .trim()
            .parse::<u32>()
            .map_err(|_| GitLabError::InvalidHeader {
                header: TOTAL_PAGES_HEADER,
                value: value.to_string(),
            })
    }

    /// List all packages in a project, page by page.
    ///
    /// Pages are fetched in increasing order and concatenated as returned.
    /// No deduplication and no sorting.
    pub async fn list_packages(
        &self,
        project: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<Package>, GitLabError> {
        let total_pages = self.total_pages(project).await?;
        tracing::debug!(project, total_pages, "Listing packages");

        emit(
            on_progress,
            RegistryProgress::FetchingPackages {
                project: project.to_string(),
                total_pages,
            },
        );

        let mut packages = Vec::new();
        for page in 1..=total_pages {
            let url = format!(
                "{}?per_page={}&page={}",
                self.packages_url(project),
                PAGE_SIZE,
                page
            );
            let batch: Vec<Package> = self.get_json(url).await?;
            let count = batch.len();
            packages.extend(batch);

            emit(
                on_progress,
                RegistryProgress::FetchedPage {
                    page,
                    count,
                    total_so_far: packages.len(),
                    total_pages,
                },
            );
        }

        emit(
            on_progress,
            RegistryProgress::FetchComplete {
                project: project.to_string(),
                total: packages.len(),
            },
        );

        Ok(packages)
    }

    /// List every package id in a project, in listing order.
    pub async fn list_package_ids(
        &self,
        project: &str,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Vec<u64>, GitLabError> {
        let packages = self.list_packages(project, on_progress).await?;
        Ok(packages.into_iter().map(|p| p.id).collect())
    }

    /// Get a single package.
    pub async fn get_package(&self, project: &str, id: u64) -> Result<Package, GitLabError> {
        self.get_json(format!("{}/{}", self.packages_url(project), id))
            .await
    }

    /// Get a single package as the raw JSON GitLab returned.
    pub async fn get_package_json(
        &self,
        project: &str,
        id: u64,
    ) -> Result<serde_json::Value, GitLabError> {
        self.get_json(format!("{}/{}", self.packages_url(project), id))
            .await
    }

    /// Fetch the simple index HTML for a package.
    ///
    /// Returns the URL that was fetched alongside the body so relative links
    /// can be resolved against it.
    pub async fn get_simple_index(
        &self,
        project: &str,
        name: &str,
    ) -> Result<(String, String), GitLabError> {
        let url = self.simple_index_url(project, name);
        let response = self.send(HttpMethod::Get, url.clone()).await?;
        Ok((url, response.text()))
    }

    /// Download a distribution file into `dir`.
    ///
    /// The body is streamed to a hidden temporary file which is renamed to
    /// the `Content-Disposition` filename once complete. A response without
    /// a usable filename is an error, and a failed download leaves nothing
    /// behind in `dir`.
    pub async fn download_file(
        &self,
        url: &str,
        dir: &Path,
    ) -> Result<DownloadedFile, GitLabError> {
        let (file, temp_path) = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(dir)?
            .into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let request = self.request(HttpMethod::Get, url.to_string());
        let response = self.download_transport.send_to(request, &mut file).await?;
        if !response.is_success() {
            return Err(GitLabError::from_status(response.status, &response.text()));
        }
        file.flush().await?;
        drop(file);

        let filename = response
            .header("Content-Disposition")
            .and_then(content_disposition_filename)
            .ok_or_else(|| GitLabError::MissingHeader {
                header: "Content-Disposition",
                url: url.to_string(),
            })?;

        let path = dir.join(&filename);
        temp_path.persist(&path).map_err(|e| e.error)?;
        let size = tokio::fs::metadata(&path).await?.len();
        tracing::debug!(%filename, size, "Downloaded file");

        Ok(DownloadedFile {
            filename,
            path,
            size,
        })
    }

    /// Delete a single package.
    pub async fn delete_package(&self, project: &str, id: u64) -> Result<(), GitLabError> {
        let url = format!("{}/{}", self.packages_url(project), id);
        self.send(HttpMethod::Delete, url).await?;
        Ok(())
    }
}
