use std::path::Path;

use console::style;
use pyferry::export_inventory;

use super::shared::{Session, reporter};

pub(crate) async fn handle_get_csv(
    session: &Session,
    project: &str,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let (reporter, callback) = reporter();
    let result = export_inventory(&session.client, project, path, Some(&*callback)).await;
    reporter.finish();

    let rows = result?;
    println!(
        "{} Wrote {} packages to {}",
        style("✓").green().bold(),
        rows,
        style(path.display()).cyan()
    );
    Ok(())
}
