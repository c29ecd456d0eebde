//! Bulk deletion of every package in a project.

use crate::gitlab::{GitLabClient, GitLabError};
use crate::progress::{ProgressCallback, RegistryProgress, emit};

/// The only answer that confirms deletion (case-insensitive).
pub const CONFIRMATION_WORD: &str = "yes";

/// Question shown before deleting.
pub fn confirmation_prompt(project: &str) -> String {
    format!(
        "Are you sure you want to delete all PyPI packages from project {}? Type '{}' to confirm: ",
        project, CONFIRMATION_WORD
    )
}

/// Whether a typed answer confirms deletion.
///
/// The line ending is ignored; anything else must match exactly.
pub fn is_confirmed(answer: &str) -> bool {
    answer
        .trim_end_matches(['\r', '\n'])
        .eq_ignore_ascii_case(CONFIRMATION_WORD)
}

/// A package that could not be deleted.
#[derive(Debug, Clone)]
pub struct DeleteFailure {
    pub id: u64,
    pub error: String,
}

/// Outcome of a bulk delete.
#[derive(Debug)]
pub enum DeleteOutcome {
    /// The answer was not a confirmation. Nothing was requested.
    Cancelled,
    /// The project has no packages.
    NothingToDelete,
    Deleted {
        deleted: Vec<u64>,
        failures: Vec<DeleteFailure>,
    },
}

/// Delete every package in `project` if `answer` confirms it.
///
/// The id list is fetched once; each id gets exactly one DELETE and failures
/// do not stop the loop. A listing failure is returned as an error.
pub async fn delete_all_packages(
    client: &GitLabClient,
    project: &str,
    answer: &str,
    on_progress: Option<&ProgressCallback>,
) -> Result<DeleteOutcome, GitLabError> {
    if !is_confirmed(answer) {
        tracing::info!(project, "Deletion cancelled");
        return Ok(DeleteOutcome::Cancelled);
    }

    let ids = client.list_package_ids(project, on_progress).await?;
    if ids.is_empty() {
        tracing::info!(project, "No packages found to delete");
        return Ok(DeleteOutcome::NothingToDelete);
    }

    emit(
        on_progress,
        RegistryProgress::DeletingPackages {
            project: project.to_string(),
            count: ids.len(),
        },
    );

    let mut deleted = Vec::new();
    let mut failures = Vec::new();

    for id in ids {
        match client.delete_package(project, id).await {
            Ok(()) => {
                tracing::debug!(project, id, "Deleted package");
                emit(on_progress, RegistryProgress::Deleted { id });
                deleted.push(id);
            }
            Err(e) => {
                tracing::warn!(project, id, error = %e, "Failed to delete package");
                emit(
                    on_progress,
                    RegistryProgress::DeleteFailed {
                        id,
                        error: e.to_string(),
                    },
                );
                failures.push(DeleteFailure {
                    id,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(DeleteOutcome::Deleted { deleted, failures })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gitlab::test_support::*;
    use crate::http::{HttpMethod, MockTransport, response};

    #[test]
    fn test_is_confirmed() {
        assert!(is_confirmed("yes"));
        assert!(is_confirmed("YES\n"));
        assert!(is_confirmed("Yes\r\n"));
        assert!(!is_confirmed("y"));
        assert!(!is_confirmed("yes please"));
        assert!(!is_confirmed(" yes"));
        assert!(!is_confirmed(""));
    }

    #[test]
    fn test_confirmation_prompt() {
        assert_eq!(
            confirmation_prompt("42"),
            "Are you sure you want to delete all PyPI packages from project 42? Type 'yes' to confirm: "
        );
    }

    #[tokio::test]
    async fn test_declined_answer_issues_no_requests() {
        let transport = MockTransport::new();

        for answer in ["no", "", "yess", "n\n"] {
            let outcome = delete_all_packages(&client(&transport), "1", answer, None)
                .await
                .expect("cancel is not an error");
            assert!(matches!(outcome, DeleteOutcome::Cancelled));
        }

        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_empty_project_deletes_nothing() {
        let transport = MockTransport::new();
        mock_listing(&transport, "1", &[]);

        let outcome = delete_all_packages(&client(&transport), "1", "yes", None)
            .await
            .expect("listing should succeed");

        assert!(matches!(outcome, DeleteOutcome::NothingToDelete));
        assert_eq!(transport.count(HttpMethod::Delete), 0);
    }

    #[tokio::test]
    async fn test_one_delete_per_id_and_failures_continue() {
        let transport = MockTransport::new();
        mock_listing(
            &transport,
            "1",
            &[
                vec![package_json(10, "a", "1.0"), package_json(11, "b", "1.0")],
                vec![package_json(12, "c", "1.0")],
            ],
        );
        transport.push_response(
            HttpMethod::Delete,
            format!("{HOST}/api/v4/projects/1/packages/10"),
            response(204, vec![], ""),
        );
        transport.push_response(
            HttpMethod::Delete,
            format!("{HOST}/api/v4/projects/1/packages/11"),
            response(500, vec![], "boom"),
        );
        transport.push_response(
            HttpMethod::Delete,
            format!("{HOST}/api/v4/projects/1/packages/12"),
            response(204, vec![], ""),
        );

        let outcome = delete_all_packages(&client(&transport), "1", "YES", None)
            .await
            .expect("listing should succeed");

        match outcome {
            DeleteOutcome::Deleted { deleted, failures } => {
                assert_eq!(deleted, vec![10, 12]);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].id, 11);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(transport.count(HttpMethod::Delete), 3);
    }

    #[tokio::test]
    async fn test_listing_failure_is_returned() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            format!("{HOST}/api/v4/projects/1/packages?per_page=100"),
            response(200, vec![("X-Total-Pages", "two")], "[]"),
        );

        let err = delete_all_packages(&client(&transport), "1", "yes", None)
            .await
            .expect_err("invalid header should fail");
        assert!(matches!(err, GitLabError::InvalidHeader { .. }));
        assert_eq!(transport.count(HttpMethod::Delete), 0);
    }
}
