use crate::condenser::paths::CondenserPaths;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Scheduler progress pointer. `last_summarized_index` is monotonically
/// non-decreasing outside of an explicit clear-history: all messages
/// below it are covered by some summary, none at or above it are.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerState {
    pub schema_version: u32,
    pub last_summarized_index: usize,
    pub last_trigger_epoch_secs: Option<u64>,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self {
            schema_version: 1,
            last_summarized_index: 0,
            last_trigger_epoch_secs: None,
        }
    }
}

pub fn state_file_path(paths: &CondenserPaths) -> PathBuf {
    paths.state_file.clone()
}

pub fn load(paths: &CondenserPaths) -> Result<SchedulerState> {
    let file = state_file_path(paths);
    if !file.exists() {
        return Ok(SchedulerState::default());
    }

    let raw =
        fs::read_to_string(&file).with_context(|| format!("failed to read {}", file.display()))?;
    let parsed: SchedulerState = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    Ok(parsed)
}

pub fn save(paths: &CondenserPaths, state: &SchedulerState) -> Result<PathBuf> {
    let file = state_file_path(paths);
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(state)?;
    fs::write(&file, format!("{data}\n"))
        .with_context(|| format!("failed to write {}", file.display()))?;
    Ok(file)
}
