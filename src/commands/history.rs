use crate::commands::CommandReport;
use crate::condenser::paths::resolve_paths;
use crate::condenser::state;
use crate::condenser::store::{self, SummaryStore};
use anyhow::Result;

pub fn run_show() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("history");

    let records = SummaryStore::new(&paths).list()?;
    if records.is_empty() {
        report.detail("no summary history");
        return Ok(report);
    }

    let rendered: Vec<String> = records
        .iter()
        .map(|r| {
            format!(
                "【{}】{}{}\n{}",
                r.time,
                r.range_label(),
                if r.auto { " (自动)" } else { "" },
                r.content
            )
        })
        .collect();
    report.detail(rendered.join("\n\n---\n\n"));
    Ok(report)
}

/// Clear the history and the scheduler pointer together.
pub fn run_clear() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("history clear");

    store::clear_history(&paths)?;
    report.detail("history cleared");
    report.detail(format!(
        "last_summarized_index={}",
        state::load(&paths)?.last_summarized_index
    ));
    Ok(report)
}
