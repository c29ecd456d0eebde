//! pyferry CLI - manage PyPI packages in GitLab package registries.

mod commands;
mod config;
mod progress;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::Action;
use crate::commands::shared::Connection;

#[derive(Parser)]
#[command(name = "pyferry")]
#[command(version)]
#[command(about = "Manage PyPI packages in GitLab using SSO authentication or a GitLab token")]
#[command(
    long_about = "pyferry inspects, mirrors, inventories and deletes the PyPI packages stored \
in a GitLab project's package registry. It authenticates with a personal access token or \
through GitLab's OAuth authorization-code flow (--sso), which opens a browser and waits for \
the redirect on a local callback listener."
)]
#[command(after_long_help = r#"EXAMPLES
    Show one package:
        $ pyferry --gitlab-server https://gitlab.example.com --gitlab-token glpat-... \
              package-info --project-id 42 --package-id 1001

    Copy every package from one project to another, signing in through the browser:
        $ pyferry --gitlab-server https://gitlab.example.com --sso \
              clone --src-project-id group/source --dst-project-id group/mirror

    Export name,version rows for a project:
        $ pyferry --gitlab-server gitlab.example.com get-csv --project-id 42 -o packages.csv

    Delete every package without the interactive prompt:
        $ pyferry --gitlab-server gitlab.example.com delete --project-id 42 --yes

    Generate shell completions:
        $ pyferry completions bash > ~/.local/share/bash-completion/completions/pyferry

CONFIGURATION
    pyferry reads configuration from:
      1. ~/.config/pyferry/config.toml (or $XDG_CONFIG_HOME/pyferry/config.toml)
      2. ./pyferry.toml
      3. Environment variables (PYFERRY_* prefix, e.g., PYFERRY_GITLAB__TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    PYFERRY_GITLAB__SERVER         GitLab server URL
    PYFERRY_GITLAB__TOKEN          GitLab personal access token
    PYFERRY_GITLAB__USER           Username used for uploads when cloning
    GITLAB_CLIENT_ID               OAuth application id (required for --sso)
    GITLAB_CLIENT_SECRET           OAuth application secret (required for --sso)
    PYFERRY_OAUTH__CALLBACK_PORT   Local callback port (default: 8000)
    RUST_LOG                       Log filter for non-interactive output
"#)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Connection options accepted by every command.
#[derive(Debug, Clone, Args)]
struct GlobalArgs {
    /// GitLab server URL (required, or from PYFERRY_GITLAB__SERVER env/config)
    #[arg(long, alias = "gitlab_server", global = true)]
    gitlab_server: Option<String>,

    /// GitLab private token (ignored if --sso is used)
    #[arg(long, alias = "gitlab_token", global = true)]
    gitlab_token: Option<String>,

    /// GitLab username (obtained automatically with --sso)
    #[arg(long, alias = "gitlab_user", global = true)]
    gitlab_user: Option<String>,

    /// Authenticate through the browser to obtain a token and username
    #[arg(long, global = true)]
    sso: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Get information about a specific PyPI package
    #[command(alias = "package_info")]
    PackageInfo {
        /// Project id or path (e.g., 42 or group/project)
        #[arg(long, alias = "project_id")]
        project_id: Option<String>,

        /// Package id
        #[arg(long, alias = "package_id")]
        package_id: Option<u64>,
    },
    /// Clone all PyPI packages from the source project to the destination project
    Clone {
        /// Project to copy from
        #[arg(long, alias = "src_project_id")]
        src_project_id: Option<String>,

        /// Project to upload into
        #[arg(long, alias = "dst_project_id")]
        dst_project_id: Option<String>,
    },
    /// Generate a CSV of PyPI package names and versions in a project
    #[command(alias = "get_csv")]
    GetCsv {
        /// Project id or path
        #[arg(long, alias = "project_id")]
        project_id: Option<String>,

        /// Output file (default: export.csv_path from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete all PyPI packages from a project
    Delete {
        /// Project id or path
        #[arg(long, alias = "project_id")]
        project_id: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

/// Treat blank identifiers the same as missing ones.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Commands {
    /// Check that every identifier the command needs was given.
    fn into_action(self) -> Result<Action, &'static str> {
        match self {
            Commands::PackageInfo {
                project_id,
                package_id,
            } => match (present(project_id), package_id) {
                (Some(project), Some(package_id)) => Ok(Action::PackageInfo {
                    project,
                    package_id,
                }),
                _ => Err("Project ID and Package ID are required to return package information."),
            },
            Commands::Clone {
                src_project_id,
                dst_project_id,
            } => match (present(src_project_id), present(dst_project_id)) {
                (Some(source), Some(destination)) => Ok(Action::Clone {
                    source,
                    destination,
                }),
                _ => Err("Source project ID and Destination project ID are required for cloning."),
            },
            Commands::GetCsv { project_id, output } => match present(project_id) {
                Some(project) => Ok(Action::GetCsv { project, output }),
                None => Err("Project ID is required for generating CSV."),
            },
            Commands::Delete { project_id, yes } => match present(project_id) {
                Some(project) => Ok(Action::Delete {
                    project,
                    assume_yes: yes,
                }),
                None => Err("Project ID is required for deletion."),
            },
            Commands::Completions { shell } => Ok(Action::Completions { shell }),
        }
    }
}

/// Print a diagnostic and exit non-zero.
fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}", message);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing for non-TTY mode (structured logging)
    // Only initialize if not connected to a TTY
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("pyferry=info,pyferry_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();

    let cli = Cli::parse();

    // Identifiers are checked before anything touches the network
    let action = cli.command.into_action().unwrap_or_else(|msg| fail(msg));

    let connection = Connection {
        server: present(cli.global.gitlab_server).or_else(|| config.gitlab.server.clone()),
        token: present(cli.global.gitlab_token).or_else(|| config.gitlab.token.clone()),
        user: present(cli.global.gitlab_user).or_else(|| config.gitlab.user.clone()),
        sso: cli.global.sso,
    };

    if let Err(e) = commands::run(action, connection, &config).await {
        fail(e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_before_and_after_subcommand() {
        let cli = parse(&[
            "pyferry",
            "--gitlab-server",
            "https://gitlab.example.com",
            "delete",
            "--project-id",
            "42",
            "--sso",
        ]);
        assert_eq!(
            cli.global.gitlab_server.as_deref(),
            Some("https://gitlab.example.com")
        );
        assert!(cli.global.sso);
    }

    #[test]
    fn test_underscore_aliases() {
        let cli = parse(&[
            "pyferry",
            "--gitlab_server",
            "gitlab.example.com",
            "--gitlab_token",
            "glpat-x",
            "package_info",
            "--project_id",
            "7",
            "--package_id",
            "99",
        ]);
        assert_eq!(cli.global.gitlab_token.as_deref(), Some("glpat-x"));
        match cli.command.into_action() {
            Ok(Action::PackageInfo {
                project,
                package_id,
            }) => {
                assert_eq!(project, "7");
                assert_eq!(package_id, 99);
            }
            _ => panic!("expected package-info"),
        }

        let cli = parse(&["pyferry", "get_csv", "--project_id", "group/app"]);
        assert!(matches!(
            cli.command.into_action(),
            Ok(Action::GetCsv { ref project, output: None }) if project == "group/app"
        ));
    }

    #[test]
    fn test_missing_identifiers_are_reported() {
        let cases: [(&[&str], &str); 5] = [
            (
                &["pyferry", "package-info", "--project-id", "7"],
                "Project ID and Package ID are required to return package information.",
            ),
            (
                &["pyferry", "clone", "--src-project-id", "1"],
                "Source project ID and Destination project ID are required for cloning.",
            ),
            (
                &["pyferry", "get-csv"],
                "Project ID is required for generating CSV.",
            ),
            (
                &["pyferry", "delete", "--project-id", "  "],
                "Project ID is required for deletion.",
            ),
            (
                &["pyferry", "clone", "--dst-project-id", "2"],
                "Source project ID and Destination project ID are required for cloning.",
            ),
        ];

        for (args, expected) in cases {
            match parse(args).command.into_action() {
                Err(msg) => assert_eq!(msg, expected),
                Ok(_) => panic!("{:?} should be rejected", args),
            }
        }
    }

    #[test]
    fn test_clone_and_delete_actions() {
        let cli = parse(&[
            "pyferry",
            "clone",
            "--src-project-id",
            "group/src",
            "--dst-project-id",
            "group/dst",
        ]);
        assert!(matches!(
            cli.command.into_action(),
            Ok(Action::Clone { ref source, ref destination })
                if source == "group/src" && destination == "group/dst"
        ));

        let cli = parse(&["pyferry", "delete", "--project-id", "42", "-y"]);
        assert!(matches!(
            cli.command.into_action(),
            Ok(Action::Delete { assume_yes: true, .. })
        ));
    }

    #[test]
    fn test_non_numeric_package_id_is_a_parse_error() {
        assert!(
            Cli::try_parse_from([
                "pyferry",
                "package-info",
                "--project-id",
                "1",
                "--package-id",
                "abc"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_present_filters_blank_values() {
        assert_eq!(present(Some(" 42 ".to_string())), Some("42".to_string()));
        assert_eq!(present(Some("   ".to_string())), None);
        assert_eq!(present(None), None);
    }
}
