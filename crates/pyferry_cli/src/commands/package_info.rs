use super::shared::Session;

pub(crate) async fn handle_package_info(
    session: &Session,
    project: &str,
    package_id: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let info = session.client.get_package_json(project, package_id).await?;
    println!("Package Information for ID {}:", package_id);
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
