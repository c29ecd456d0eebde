pub(crate) mod clone;
pub(crate) mod csv;
pub(crate) mod delete;
pub(crate) mod meta;
pub(crate) mod package_info;
pub(crate) mod shared;

use std::path::PathBuf;

use crate::config::Config;
use shared::Connection;

/// A fully validated command, ready to run.
pub(crate) enum Action {
    PackageInfo { project: String, package_id: u64 },
    Clone { source: String, destination: String },
    GetCsv { project: String, output: Option<PathBuf> },
    Delete { project: String, assume_yes: bool },
    Completions { shell: clap_complete::Shell },
}

impl Action {
    /// Whether the command uploads, and so needs a username.
    fn uploads(&self) -> bool {
        matches!(self, Action::Clone { .. })
    }
}

/// Authenticate, then run `action` against the registry.
pub(crate) async fn run(
    action: Action,
    connection: Connection,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Action::Completions { shell } = action {
        return meta::handle_completions(shell);
    }

    let session = shared::open_session(connection, config, action.uploads()).await?;

    match action {
        Action::PackageInfo {
            project,
            package_id,
        } => package_info::handle_package_info(&session, &project, package_id).await,
        Action::Clone {
            source,
            destination,
        } => clone::handle_clone(&session, &source, &destination).await,
        Action::GetCsv { project, output } => {
            let path = output.unwrap_or_else(|| config.export.csv_path.clone());
            csv::handle_get_csv(&session, &project, &path).await
        }
        Action::Delete {
            project,
            assume_yes,
        } => delete::handle_delete(&session, &project, assume_yes).await,
        Action::Completions { .. } => Ok(()),
    }
}
