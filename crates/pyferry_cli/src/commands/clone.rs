use console::style;
use pyferry::upload::UPLOAD_TIMEOUT;
use pyferry::mirror::MirrorReport;
use pyferry::{MirrorRequest, RegistryUploader, mirror_packages};

use super::shared::{Session, reporter};

pub(crate) async fn handle_clone(
    session: &Session,
    source: &str,
    destination: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(username) = session.username.as_deref() else {
        return Err("GitLab username is required for cloning if SSO is not used.".into());
    };

    let uploader = RegistryUploader::with_timeout(UPLOAD_TIMEOUT)?;
    let request = MirrorRequest::new(&session.client, source, destination, username);

    let (reporter, callback) = reporter();
    let result = mirror_packages(&session.client, &uploader, &request, Some(&*callback)).await;
    reporter.finish();

    let report = result?;
    // Individual failures were already reported as they happened.
    println!("{}", summary(source, destination, &report));

    Ok(())
}

fn summary(source: &str, destination: &str, report: &MirrorReport) -> String {
    format!(
        "{} Cloned {} packages from {} to {}: {} uploaded, {} skipped, {} failed",
        style("✓").green().bold(),
        report.packages,
        style(source).cyan(),
        style(destination).cyan(),
        report.uploaded,
        report.skipped,
        report.failed()
    )
}
