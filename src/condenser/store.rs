use crate::condenser::paths::CondenserPaths;
use crate::condenser::state;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// One completed summarization. Immutable once created; the store only
/// ever appends or bulk-clears.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub time: String,
    pub start: usize,
    pub end: usize,
    pub content: String,
    pub auto: bool,
}

impl SummaryRecord {
    /// One-based inclusive range label, the way the host application
    /// numbers messages for display.
    pub fn range_label(&self) -> String {
        format!("{}-{}", self.start + 1, self.end)
    }
}

/// Append-only summary history, one JSON record per line in
/// chronological order.
#[derive(Debug, Clone)]
pub struct SummaryStore {
    path: PathBuf,
}

impl SummaryStore {
    pub fn new(paths: &CondenserPaths) -> Self {
        Self {
            path: paths.summaries_file.clone(),
        }
    }

    pub fn append(&self, record: &SummaryRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let line = format!("{}\n", serde_json::to_string(record)?);
        use std::io::Write;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// All records, most recent first. Unparseable lines are skipped so
    /// one corrupt entry never hides the rest of the history.
    pub fn list(&self) -> Result<Vec<SummaryRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;

        let mut records: Vec<SummaryRecord> = raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        records.reverse();
        Ok(records)
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}

/// Clear the summary history and reset the scheduler pointer together.
/// An orphaned pointer with no matching history is meaningless, so the
/// two are never cleared independently.
pub fn clear_history(paths: &CondenserPaths) -> Result<()> {
    SummaryStore::new(paths).clear()?;
    let mut st = state::load(paths)?;
    st.last_summarized_index = 0;
    state::save(paths, &st)?;
    Ok(())
}
