use crate::api::client::CompletionClient;
use crate::commands::CommandReport;
use crate::condenser::chat;
use crate::condenser::config::load_config;
use crate::condenser::paths::resolve_paths;
use crate::condenser::scheduler::{MemorySink, Scheduler};
use crate::condenser::state;
use crate::condenser::store::SummaryStore;
use crate::condenser::worldinfo::WorldInfoClient;
use crate::error::CondenserError;
use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SummarizeOptions {
    pub chat: PathBuf,
}

pub fn run(opts: &SummarizeOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("summarize");

    let config = load_config(&paths)?;
    let client = match CompletionClient::new(&config.api) {
        Ok(client) => client,
        Err(err) => {
            report.issue(err.to_string());
            return Ok(report);
        }
    };

    let sink = if config.world_info.enabled {
        match WorldInfoClient::new(&config.world_info) {
            Ok(sink) => Some(sink),
            Err(err) => {
                // The summary is still produced without the sink.
                report.detail(format!("world info sink disabled: {err}"));
                None
            }
        }
    } else {
        None
    };

    let mut messages = chat::load_chat(&opts.chat)?;
    let store = SummaryStore::new(&paths);
    let mut scheduler = Scheduler::new(
        &config,
        &client,
        sink.as_ref().map(|s| s as &dyn MemorySink),
        state::load(&paths)?,
    );

    match scheduler.summarize_manual(&mut messages, &store) {
        Ok(success) => {
            report.detail(format!("range={}", success.record.range_label()));
            report.detail(format!(
                "summary:\n{}",
                CommandReport::preview(&success.record.content, 2000)
            ));
            if success.hidden > 0 {
                report.detail(format!("hidden={}", success.hidden));
                chat::save_chat(&opts.chat, &messages)?;
            }
            for note in &success.notes {
                report.detail(note.clone());
            }
            state::save(&paths, scheduler.state())?;

            if let Some(sink) = &sink {
                if !config.world_info.chat_id.trim().is_empty() {
                    if let Err(err) = sink.bind_to_chat(&config.world_info.chat_id) {
                        report.detail(format!("world info bind failed: {err}"));
                    }
                }
            }
        }
        Err(CondenserError::NoHistory) => {
            report.issue("no chat history");
        }
        Err(CondenserError::EmptyContent { start, end }) => {
            report.issue(format!(
                "nothing to summarize in range {}-{} (check extraction rules)",
                start + 1,
                end
            ));
        }
        Err(err) => {
            report.issue(err.to_string());
        }
    }

    Ok(report)
}
