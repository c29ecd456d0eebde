use std::io::{self, BufRead, Write};

use console::style;
use pyferry::delete::{CONFIRMATION_WORD, confirmation_prompt};
use pyferry::{DeleteOutcome, delete_all_packages};

use super::shared::{Session, reporter};

/// Ask on stdin. End of input counts as "no".
fn read_answer(project: &str) -> io::Result<String> {
    print!("{}", confirmation_prompt(project));
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer)
}

pub(crate) async fn handle_delete(
    session: &Session,
    project: &str,
    assume_yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let answer = if assume_yes {
        CONFIRMATION_WORD.to_string()
    } else {
        read_answer(project)?
    };

    let (reporter, callback) = reporter();
    let result = delete_all_packages(&session.client, project, &answer, Some(&*callback)).await;
    reporter.finish();

    // Individual failures were already reported as they happened.
    println!("{}", summary(project, &result?));

    Ok(())
}

fn summary(project: &str, outcome: &DeleteOutcome) -> String {
    match outcome {
        DeleteOutcome::Cancelled => "Deletion cancelled.".to_string(),
        DeleteOutcome::NothingToDelete => "No packages found to delete.".to_string(),
        DeleteOutcome::Deleted { deleted, failures } => format!(
            "{} Deleted {} packages from {}, {} failed",
            style("✓").green().bold(),
            deleted.len(),
            style(project).cyan(),
            failures.len()
        ),
    }
}
