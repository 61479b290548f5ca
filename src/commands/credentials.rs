use crate::commands::CommandReport;
use crate::condenser::config::{Credentials, save_credentials};
use crate::condenser::paths::resolve_paths;
use anyhow::Result;

/// Store endpoint and key in the credentials side-file. The values
/// overlay the main config at load time, so the TOML file can stay free
/// of secrets.
pub fn run_set(endpoint: &str, api_key: &str) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("credentials");

    if endpoint.trim().is_empty() && api_key.trim().is_empty() {
        report.issue("nothing to store: endpoint and key are both empty");
        return Ok(report);
    }

    save_credentials(
        &paths,
        &Credentials {
            endpoint: endpoint.trim().to_string(),
            api_key: api_key.trim().to_string(),
        },
    )?;
    report.detail(format!(
        "credentials written to {}",
        paths.credentials_file.display()
    ));
    Ok(report)
}
