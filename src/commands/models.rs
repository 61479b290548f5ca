use crate::api::client::CompletionClient;
use crate::commands::CommandReport;
use crate::condenser::config::load_config;
use crate::condenser::paths::resolve_paths;
use anyhow::Result;

pub fn run_list() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let config = load_config(&paths)?;
    let mut report = CommandReport::new("models");

    let client = match CompletionClient::new(&config.api) {
        Ok(client) => client,
        Err(err) => {
            report.issue(err.to_string());
            return Ok(report);
        }
    };

    match client.list_models() {
        Ok(models) if models.is_empty() => report.detail("endpoint returned no models"),
        Ok(models) => {
            report.detail(format!("{} model(s)", models.len()));
            for model in models {
                report.detail(model);
            }
        }
        Err(err) => report.issue(err.to_string()),
    }
    Ok(report)
}

pub fn run_test_connection() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let config = load_config(&paths)?;
    let mut report = CommandReport::new("test");

    let client = match CompletionClient::new(&config.api) {
        Ok(client) => client,
        Err(err) => {
            report.issue(err.to_string());
            return Ok(report);
        }
    };

    match client.test_connection() {
        Ok(()) => report.detail(format!("connection ok, model={}", config.api.model)),
        Err(err) => report.issue(err.to_string()),
    }
    Ok(report)
}
