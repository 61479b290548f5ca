use crate::commands::CommandReport;
use crate::condenser::chat;
use crate::condenser::config::{load_config, load_file_config, save_config};
use crate::condenser::extract;
use crate::condenser::paths::resolve_paths;
use crate::condenser::rules::{self, RuleKind};
use anyhow::Result;
use std::path::PathBuf;

const PREVIEW_CHARS: usize = 500;

pub fn run_list() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let config = load_config(&paths)?;
    let mut report = CommandReport::new("rules list");

    if config.extraction.rules.is_empty() {
        report.detail("no rules (everything is kept)");
        return Ok(report);
    }

    report.detail(format!(
        "extraction {}",
        if config.extraction.enabled {
            "enabled"
        } else {
            "disabled"
        }
    ));
    for (index, rule) in config.extraction.rules.iter().enumerate() {
        report.detail(format!("[{index}] {} {}", rule.kind.label(), rule.pattern));
    }
    Ok(report)
}

pub fn run_add(kind: RuleKind, pattern: &str) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut config = load_file_config(&paths)?;
    let mut report = CommandReport::new("rules add");

    match config.extraction.rules.add(kind, pattern) {
        Ok(()) => {
            save_config(&paths, &config)?;
            report.detail(format!("added {} {}", kind.label(), pattern.trim()));
            report.detail(format!("rules={}", config.extraction.rules.len()));
        }
        Err(err) => report.issue(err.to_string()),
    }
    Ok(report)
}

pub fn run_remove(index: usize) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut config = load_file_config(&paths)?;
    let mut report = CommandReport::new("rules remove");

    match config.extraction.rules.remove(index) {
        Some(rule) => {
            save_config(&paths, &config)?;
            report.detail(format!("removed {} {}", rule.kind.label(), rule.pattern));
        }
        None => report.issue(format!("no rule at index {index}")),
    }
    Ok(report)
}

pub fn run_clear() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut config = load_file_config(&paths)?;
    let mut report = CommandReport::new("rules clear");

    let removed = config.extraction.rules.len();
    config.extraction.rules.clear();
    save_config(&paths, &config)?;
    report.detail(format!("cleared {removed} rule(s)"));
    Ok(report)
}

pub fn run_preset(key: &str) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut config = load_file_config(&paths)?;
    let mut report = CommandReport::new("rules preset");

    match rules::apply_preset(&mut config.extraction.rules, key) {
        Ok(added) => {
            save_config(&paths, &config)?;
            let name = rules::find_preset(key).map(|p| p.name).unwrap_or(key);
            report.detail(format!("preset={key} ({name}) added={added}"));
        }
        Err(err) => {
            report.issue(err.to_string());
            let known: Vec<&str> = rules::PRESET_RULES.iter().map(|p| p.key).collect();
            report.issue(format!("known presets: {}", known.join(", ")));
        }
    }
    Ok(report)
}

/// Run the extraction pipeline against the last message of the chat log
/// and show original vs extracted side by side.
pub fn run_test(chat_path: &PathBuf) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let config = load_config(&paths)?;
    let mut report = CommandReport::new("rules test");

    let messages = chat::load_chat(chat_path)?;
    let Some(last) = messages.last() else {
        report.issue("no chat history");
        return Ok(report);
    };

    let extracted = extract::process(
        &last.text,
        &config.extraction.rules,
        &config.extraction.blacklist,
    );

    report.detail(format!(
        "=== original ({} chars) ===\n{}",
        last.text.chars().count(),
        CommandReport::preview(&last.text, PREVIEW_CHARS)
    ));
    report.detail(format!(
        "=== extracted ({} chars) ===\n{}",
        extracted.chars().count(),
        CommandReport::preview(&extracted, PREVIEW_CHARS)
    ));
    Ok(report)
}
