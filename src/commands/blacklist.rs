use crate::commands::CommandReport;
use crate::condenser::config::{load_config, load_file_config, save_config};
use crate::condenser::paths::resolve_paths;
use anyhow::Result;

pub fn run_list() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let config = load_config(&paths)?;
    let mut report = CommandReport::new("blacklist list");

    if config.extraction.blacklist.is_empty() {
        report.detail("blacklist is empty");
        return Ok(report);
    }
    for (index, entry) in config.extraction.blacklist.iter().enumerate() {
        report.detail(format!("[{index}] {entry}"));
    }
    Ok(report)
}

pub fn run_add(entry: &str) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut config = load_file_config(&paths)?;
    let mut report = CommandReport::new("blacklist add");

    if config.extraction.blacklist.add(entry) {
        save_config(&paths, &config)?;
        report.detail(format!("added `{}`", entry.trim()));
    } else {
        report.issue(format!("`{}` is empty or already present", entry.trim()));
    }
    Ok(report)
}

pub fn run_remove(index: usize) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut config = load_file_config(&paths)?;
    let mut report = CommandReport::new("blacklist remove");

    match config.extraction.blacklist.remove(index) {
        Some(entry) => {
            save_config(&paths, &config)?;
            report.detail(format!("removed `{entry}`"));
        }
        None => report.issue(format!("no blacklist entry at index {index}")),
    }
    Ok(report)
}

pub fn run_clear() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut config = load_file_config(&paths)?;
    let mut report = CommandReport::new("blacklist clear");

    let removed = config.extraction.blacklist.len();
    config.extraction.blacklist.clear();
    save_config(&paths, &config)?;
    report.detail(format!("cleared {removed} entr(ies)"));
    Ok(report)
}
